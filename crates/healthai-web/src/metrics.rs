//! Prometheus指标

use healthai_core::{HealthError, Result};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// 网关指标收集器
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// 自动保存结果计数，按 outcome 区分
    autosave_total: IntCounterVec,
    /// 推理请求计数，按疾病和结果区分
    inference_requests_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let autosave_total = IntCounterVec::new(
            Opts::new("healthai_autosave_total", "Auto-save outcomes of prediction results"),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let inference_requests_total = IntCounterVec::new(
            Opts::new(
                "healthai_inference_requests_total",
                "Requests forwarded to the prediction service",
            ),
            &["disease", "status"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(autosave_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(inference_requests_total.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            autosave_total,
            inference_requests_total,
        })
    }

    pub fn record_autosave(&self, outcome: &str) {
        self.autosave_total.with_label_values(&[outcome]).inc();
    }

    pub fn autosave_count(&self, outcome: &str) -> u64 {
        self.autosave_total.with_label_values(&[outcome]).get()
    }

    pub fn record_inference(&self, disease: &str, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        self.inference_requests_total
            .with_label_values(&[disease, status])
            .inc();
    }

    /// 文本格式导出
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;

        String::from_utf8(buffer).map_err(|e| HealthError::Internal(e.to_string()))
    }
}

fn metrics_error(e: prometheus::Error) -> HealthError {
    HealthError::Internal(format!("metrics: {}", e))
}
