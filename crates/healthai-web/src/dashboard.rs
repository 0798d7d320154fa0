//! 仪表盘处理器

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use healthai_core::{DashboardView, HealthError, NewTestResult, ProfileUpdate};
use healthai_database::UserStore;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// 解析路径中的用户ID，格式错误按用户不存在处理
pub fn parse_user_id(raw: &str) -> Result<Uuid, HealthError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        debug!("Malformed user id: {}", raw);
        HealthError::user_not_found()
    })
}

/// 获取用户仪表盘数据
pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_user_id(&user_id)?;
    let user = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(HealthError::user_not_found)?;

    Ok(Json(DashboardView::from(&user)))
}

/// 部分更新用户资料
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_user_id(&user_id)?;
    let Json(body) = body?;

    let update = ProfileUpdate::from_json(body)?;
    update.validate()?;

    let user = state.store.update_profile(&id, update).await?;
    info!("Profile updated for user {}", id);

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": DashboardView::from(&user)
    })))
}

/// 追加检测结果
pub async fn add_test_result(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<NewTestResult>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_user_id(&user_id)?;
    let Json(request) = body?;

    let result = request.into_test_result()?;
    let user = state.store.append_test_result(&id, result).await?;
    info!(
        "Test result added for user {} ({} total)",
        id,
        user.test_results.len()
    );

    Ok(Json(json!({
        "message": "Test result added successfully",
        "testResults": user.test_results
    })))
}

/// 获取全部检测结果
pub async fn get_test_results(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_user_id(&user_id)?;
    let results = state.store.list_test_results(&id).await?;

    Ok(Json(json!({ "testResults": results })))
}
