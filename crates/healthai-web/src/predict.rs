//! 影像预测网关
//!
//! 转发上传的图片到外部预测服务，推导严重程度，并在带有调用方ID时自动保存结果。
//! 自动保存的结果单独记录，不影响预测响应本身。

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use healthai_core::{severity, Disease, HealthError, Severity, TestResult};
use healthai_database::UserStore;
use healthai_inference::{ImageUpload, Prediction};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::dashboard::parse_user_id;
use crate::error::ApiResult;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const AUTOSAVE_HEADER: &str = "x-autosave";
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// 自动保存结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveOutcome {
    /// 请求未携带调用方ID
    Skipped,
    Saved,
    UserNotFound,
    Failed(String),
}

impl AutoSaveOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AutoSaveOutcome::Skipped => "skipped",
            AutoSaveOutcome::Saved => "saved",
            AutoSaveOutcome::UserNotFound => "user_not_found",
            AutoSaveOutcome::Failed(_) => "failed",
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 调用方ID：优先请求头，其次查询参数；空值视为未提供
fn caller_id(headers: &HeaderMap, query: &PredictQuery) -> Option<String> {
    non_blank(headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok()))
        .or_else(|| non_blank(query.user_id.as_deref()))
}

/// 从multipart中读取 `image` 字段，其余字段忽略
async fn read_image(multipart: Result<Multipart, MultipartRejection>) -> ApiResult<ImageUpload> {
    let no_file = || HealthError::Validation("No image file provided".to_string());

    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            debug!("Predict request is not multipart: {}", rejection);
            return Err(no_file().into());
        }
    };

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| HealthError::Validation(format!("Invalid multipart body: {}", e)))?;
        let Some(field) = field else {
            return Err(no_file().into());
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HealthError::Validation(format!("Failed to read image: {}", e)))?;
        if bytes.is_empty() {
            return Err(no_file().into());
        }

        return Ok(ImageUpload {
            bytes: bytes.to_vec(),
            filename,
            content_type,
        });
    }
}

/// 将预测结果追加到调用方的记录中
pub async fn auto_save(
    store: &dyn UserStore,
    caller: Option<&str>,
    disease: Disease,
    prediction: &Prediction,
    severity: Severity,
) -> AutoSaveOutcome {
    let Some(raw_id) = caller else {
        return AutoSaveOutcome::Skipped;
    };
    let Ok(id) = parse_user_id(raw_id) else {
        return AutoSaveOutcome::UserNotFound;
    };

    let entry = TestResult {
        test_type: disease.as_str().to_string(),
        result: prediction.label.clone(),
        confidence: prediction.confidence,
        severity: Some(severity),
        details: Some(json!({ "source": format!("api/predict/{}", disease.as_str()) })),
        date: Utc::now(),
    };

    match store.append_test_result(&id, entry).await {
        Ok(_) => AutoSaveOutcome::Saved,
        Err(HealthError::NotFound(_)) => AutoSaveOutcome::UserNotFound,
        Err(e) => AutoSaveOutcome::Failed(e.to_string()),
    }
}

/// 影像预测处理器
pub async fn predict_handler(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(query): Query<PredictQuery>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let disease = Disease::from_segment(&segment)
        .ok_or_else(|| HealthError::NotFound(format!("Unknown prediction type: {}", segment)))?;
    let image = read_image(multipart).await?;

    let prediction = match state.inference.predict(disease, image).await {
        Ok(prediction) => {
            state.metrics.record_inference(disease.as_str(), true);
            prediction
        }
        Err(e) => {
            state.metrics.record_inference(disease.as_str(), false);
            warn!("{} Prediction Error: {}", disease.display_name(), e);
            let message = format!("Failed to process {} prediction", disease.display_name());
            let err = match e {
                invalid @ HealthError::Validation(_) => invalid,
                HealthError::Upstream { details, .. } => HealthError::Upstream { message, details },
                other => HealthError::Upstream {
                    message,
                    details: Some(Value::String(other.to_string())),
                },
            };
            return Err(err.into());
        }
    };

    let severity = severity::classify(disease, &prediction.label);

    let caller = caller_id(&headers, &query);
    let outcome = auto_save(
        state.store.as_ref(),
        caller.as_deref(),
        disease,
        &prediction,
        severity,
    )
    .await;
    state.metrics.record_autosave(outcome.label());
    match &outcome {
        AutoSaveOutcome::Skipped => {}
        AutoSaveOutcome::Saved => info!(
            "Auto-saved {} result for user {}",
            disease.as_str(),
            caller.as_deref().unwrap_or_default()
        ),
        AutoSaveOutcome::UserNotFound => warn!(
            "Auto-save {} result skipped: user {} not found",
            disease.as_str(),
            caller.as_deref().unwrap_or_default()
        ),
        AutoSaveOutcome::Failed(reason) => {
            warn!("Auto-save {} result failed: {}", disease.as_str(), reason)
        }
    }

    let mut body = prediction.raw;
    if let Some(object) = body.as_object_mut() {
        object.insert("severity".to_string(), json!(severity));
    }

    let mut response = Json(body).into_response();
    response
        .headers_mut()
        .insert(AUTOSAVE_HEADER, HeaderValue::from_static(outcome.label()));
    Ok(response)
}
