//! # HealthAI Core
//!
//! 学生健康系统的核心模块，提供数据模型、错误定义、严重程度分级、配置和通用工具。

pub mod config;
pub mod error;
pub mod models;
pub mod severity;
pub mod utils;

pub use self::config::AppConfig;
pub use error::{HealthError, Result};
pub use models::*;
pub use utils::PasswordHasher;
