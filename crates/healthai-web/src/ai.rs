//! 症状问答与症状诊断

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use healthai_core::HealthError;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::ApiResult;
use crate::state::AppState;

pub const EMPTY_SYMPTOM_REPLY: &str = "Please describe your symptoms.";
pub const CHAT_ERROR: &str = "AI service error. Please try again later.";
pub const DIAGNOSIS_ERROR: &str = "Python API Failed to respond";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SymptomCheckRequest {
    pub symptom: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessSymptomsRequest {
    pub symptoms: Option<Value>,
}

fn is_empty_symptoms(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// 症状问答
pub async fn symptom_check(
    State(state): State<AppState>,
    body: Result<Json<SymptomCheckRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;

    let Some(symptom) = request
        .symptom
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        return Ok(Json(json!({ "reply": EMPTY_SYMPTOM_REPLY })));
    };

    info!("Incoming symptom check ({} chars)", symptom.len());
    let reply = state.chat.symptom_reply(&symptom).await.map_err(|e| {
        error!("Chat service error: {}", e);
        HealthError::Service(CHAT_ERROR.to_string())
    })?;

    Ok(Json(json!({ "reply": reply })))
}

/// 症状诊断转发
pub async fn process_symptoms(
    State(state): State<AppState>,
    body: Result<Json<ProcessSymptomsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;

    let symptoms = request
        .symptoms
        .filter(|s| !is_empty_symptoms(s))
        .ok_or_else(|| HealthError::Validation("No symptoms provided".to_string()))?;

    let reply = state.diagnosis.diagnose(symptoms).await.map_err(|e| {
        error!("Diagnosis API Error: {}", e);
        HealthError::Service(DIAGNOSIS_ERROR.to_string())
    })?;

    Ok(Json(json!({ "reply": reply })))
}
