//! 对话补全服务（OpenAI兼容接口）

use async_trait::async_trait;
use healthai_core::config::InferenceConfig;
use healthai_core::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{ensure_success, http_client, transport_error};

const SERVICE: &str = "Chat service";

pub const SYSTEM_PROMPT: &str = "You are a medical assistant who gives safe advice.";
pub const FALLBACK_REPLY: &str = "I couldn't analyze your symptoms.";

/// 对话消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatChoice {
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatChoiceMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    /// 第一个选项的文本
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// 症状对话接口
#[async_trait]
pub trait ChatService: Send + Sync {
    /// 返回模型回复；模型没有给出文本时返回固定的兜底回复
    async fn symptom_reply(&self, symptom: &str) -> Result<String>;
}

/// 症状问答的消息列表
pub fn symptom_messages(symptom: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Symptoms: {}", symptom)),
    ]
}

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    referer: String,
    title: String,
    max_tokens: u32,
}

impl ChatClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        if config.chat_api_key.is_none() {
            warn!("No chat API key configured, symptom-check requests will likely be rejected");
        }

        Ok(Self {
            client: http_client(config.timeout())?,
            url: config.chat_url.clone(),
            model: config.chat_model.clone(),
            api_key: config.chat_api_key.clone(),
            referer: config.chat_referer.clone(),
            title: config.chat_title.clone(),
            max_tokens: config.chat_max_tokens,
        })
    }
}

#[async_trait]
impl ChatService for ChatClient {
    async fn symptom_reply(&self, symptom: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: symptom_messages(symptom),
        };
        debug!("Sending symptom-check to {} using {}", self.url, self.model);

        let mut builder = self
            .client
            .post(&self.url)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = ensure_success(SERVICE, response).await?;
        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        Ok(completion
            .first_text()
            .unwrap_or(FALLBACK_REPLY)
            .to_string())
    }
}
