//! # HealthAI推理集成模块
//!
//! 提供与外部推理服务的集成：
//! - 影像预测服务（阿尔茨海默、脑肿瘤、帕金森）
//! - OpenAI兼容的对话补全服务，用于症状问答
//! - 症状诊断服务

pub mod chat;
pub mod client;
pub mod diagnosis;
pub mod prediction;

pub use chat::{ChatClient, ChatService};
pub use diagnosis::{DiagnosisClient, DiagnosisService};
pub use prediction::{ImageUpload, InferenceService, Prediction, PredictionClient};
