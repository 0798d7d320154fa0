//! 错误定义模块

use thiserror::Error;

/// HealthAI系统统一错误类型
#[derive(Error, Debug)]
pub enum HealthError {
    #[error("{0}")]
    Validation(String),

    /// 邮箱已注册等冲突
    #[error("{0}")]
    Conflict(String),

    /// 凭证错误，对外消息统一
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    /// 外部推理服务调用失败，`details` 透传上游响应体
    #[error("{message}")]
    Upstream {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// 外部对话/诊断服务失败
    #[error("{0}")]
    Service(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("网络错误: {0}")]
    Network(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl HealthError {
    pub fn user_not_found() -> Self {
        HealthError::NotFound("User not found".to_string())
    }

    pub fn invalid_credentials() -> Self {
        HealthError::Auth("Invalid credentials".to_string())
    }
}

impl From<::config::ConfigError> for HealthError {
    fn from(e: ::config::ConfigError) -> Self {
        HealthError::Config(e.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for HealthError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                HealthError::Conflict("User already exists".to_string())
            }
            _ => HealthError::Database(e.to_string()),
        }
    }
}

/// HealthAI系统统一结果类型
pub type Result<T> = std::result::Result<T, HealthError>;
