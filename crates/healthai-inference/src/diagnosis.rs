//! 症状诊断服务连接器

use async_trait::async_trait;
use healthai_core::config::InferenceConfig;
use healthai_core::Result;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{ensure_success, http_client, read_body, transport_error};

const SERVICE: &str = "Diagnosis service";

/// 症状诊断接口
#[async_trait]
pub trait DiagnosisService: Send + Sync {
    /// 转发症状，返回上游的 `reply` 字段
    async fn diagnose(&self, symptoms: Value) -> Result<Value>;
}

#[derive(Clone)]
pub struct DiagnosisClient {
    client: reqwest::Client,
    url: String,
}

impl DiagnosisClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout())?,
            url: config.diagnosis_url.clone(),
        })
    }
}

#[async_trait]
impl DiagnosisService for DiagnosisClient {
    async fn diagnose(&self, symptoms: Value) -> Result<Value> {
        debug!("Forwarding symptoms to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "symptoms": symptoms }))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = ensure_success(SERVICE, response).await?;

        let body = read_body(response).await;
        Ok(body.get("reply").cloned().unwrap_or(Value::Null))
    }
}
