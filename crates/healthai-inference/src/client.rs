//! 出站HTTP客户端的公共部分

use healthai_core::{HealthError, Result};
use serde_json::Value;
use std::time::Duration;

/// 构建带超时的HTTP客户端
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| HealthError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// 读取响应体：能解析为JSON则返回JSON，否则返回原文
pub async fn read_body(response: reqwest::Response) -> Value {
    match response.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Err(e) => Value::String(e.to_string()),
    }
}

/// 将传输层错误转换为上游错误
pub fn transport_error(service: &str, e: reqwest::Error) -> HealthError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "unreachable"
    } else {
        "failed"
    };

    HealthError::Upstream {
        message: format!("{} request {}", service, kind),
        details: Some(Value::String(e.to_string())),
    }
}

/// 检查状态码，非2xx时携带响应体返回上游错误
pub async fn ensure_success(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = read_body(response).await;
    Err(HealthError::Upstream {
        message: format!("{} returned {}", service, status.as_u16()),
        details: Some(body),
    })
}
