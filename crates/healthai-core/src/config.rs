//! 配置管理
//!
//! 加载顺序：内置默认值 → 可选配置文件 → `HEALTHAI__` 前缀的环境变量

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::error::Result;
use crate::utils::DEFAULT_PBKDF2_ITERATIONS;

/// 系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 认证配置
    pub auth: AuthConfig,
    /// 外部推理服务配置
    pub inference: InferenceConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL连接串，未设置时使用内存存储
    pub url: Option<String>,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub pbkdf2_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

/// 外部推理服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// 影像预测服务根地址
    pub prediction_base_url: String,
    /// 症状诊断接口
    pub diagnosis_url: String,
    /// OpenAI兼容的对话补全接口
    pub chat_url: String,
    pub chat_model: String,
    pub chat_api_key: Option<String>,
    pub chat_referer: String,
    pub chat_title: String,
    pub chat_max_tokens: u32,
    /// 出站请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            prediction_base_url: "http://localhost:5000".to_string(),
            diagnosis_url: "http://localhost:5000/api/diagnose".to_string(),
            chat_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            chat_model: "tngtech/deepseek-r1t2-chimera:free".to_string(),
            chat_api_key: None,
            chat_referer: "http://localhost:3000".to_string(),
            chat_title: "Void Health Assistant".to_string(),
            chat_max_tokens: 300,
            timeout_secs: 60,
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl AppConfig {
    /// 加载配置
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading configuration from {}", path);
            builder = builder.add_source(File::with_name(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix("HEALTHAI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
