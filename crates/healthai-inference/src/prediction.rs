//! 影像预测服务连接器
//!
//! 上传的图片原样以 multipart 字段 `image` 转发给外部预测服务，每种疾病对应固定路径。

use async_trait::async_trait;
use healthai_core::config::InferenceConfig;
use healthai_core::{Disease, HealthError, Result};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ensure_success, http_client, read_body, transport_error};

const SERVICE: &str = "Prediction service";

/// 上传的图片
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

/// 预测结果，`raw` 为上游原始响应
#[derive(Debug, Clone)]
pub struct Prediction {
    pub raw: Value,
    pub label: String,
    pub confidence: Option<f64>,
}

impl Prediction {
    /// 标签取 `class`，其次 `result`，都没有时为 "Unknown"
    pub fn from_response(raw: Value) -> Self {
        let label = raw
            .get("class")
            .and_then(Value::as_str)
            .or_else(|| raw.get("result").and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string();
        let confidence = raw.get("confidence").and_then(Value::as_f64);

        Self {
            raw,
            label,
            confidence,
        }
    }
}

/// 预测服务接口
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn predict(&self, disease: Disease, image: ImageUpload) -> Result<Prediction>;
}

/// 外部服务上的路径
pub fn upstream_path(disease: Disease) -> &'static str {
    match disease {
        Disease::Alzheimer => "/predict/alzheimer",
        Disease::Tumor => "/predict/brain_tumor",
        Disease::Parkinsons => "/predict/parkinson",
    }
}

/// 基于HTTP的预测服务客户端
#[derive(Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout())?,
            base_url: config.prediction_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, disease: Disease) -> String {
        format!("{}{}", self.base_url, upstream_path(disease))
    }
}

#[async_trait]
impl InferenceService for PredictionClient {
    async fn predict(&self, disease: Disease, image: ImageUpload) -> Result<Prediction> {
        let url = self.endpoint(disease);
        debug!(
            "Forwarding {} bytes ({}) to {}",
            image.bytes.len(),
            image.filename,
            url
        );

        let mut part = Part::bytes(image.bytes).file_name(image.filename);
        if let Some(content_type) = image.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| HealthError::Validation(format!("Invalid content type: {}", e)))?;
        }
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = ensure_success(SERVICE, response).await?;

        let raw = read_body(response).await;
        if !raw.is_object() {
            return Err(HealthError::Upstream {
                message: format!("{} returned a non-JSON body", SERVICE),
                details: Some(raw),
            });
        }

        let prediction = Prediction::from_response(raw);
        info!(
            "{} prediction: {} ({:?})",
            disease.as_str(),
            prediction.label,
            prediction.confidence
        );
        Ok(prediction)
    }
}
