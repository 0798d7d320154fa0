//! 应用共享状态

use healthai_core::PasswordHasher;
use healthai_database::UserStore;
use healthai_inference::{ChatService, DiagnosisService, InferenceService};
use std::sync::Arc;

use crate::metrics::Metrics;

/// 每个请求共享的句柄
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub hasher: PasswordHasher,
    pub inference: Arc<dyn InferenceService>,
    pub chat: Arc<dyn ChatService>,
    pub diagnosis: Arc<dyn DiagnosisService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        inference: Arc<dyn InferenceService>,
        chat: Arc<dyn ChatService>,
        diagnosis: Arc<dyn DiagnosisService>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            hasher,
            inference,
            chat,
            diagnosis,
            metrics,
        }
    }
}
