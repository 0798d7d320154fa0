//! 用户注册与登录
//!
//! 会话标识就是用户ID，客户端在后续请求中原样回传，不签发令牌。

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use healthai_core::utils::normalize_email;
use healthai_core::{HealthError, PasswordHasher, Result, User};
use healthai_database::UserStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// 注册请求
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// 前端表单提交的是字符串，数字和数字字符串都接受
    pub age: Option<Value>,
    pub gender: Option<String>,
}

/// 登录请求
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// 注册/登录响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub user_id: Uuid,
    pub name: String,
    pub redirect: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// 年龄须为正整数，接受 `20`、`20.0` 和 `"20"`
fn parse_age(value: Option<&Value>) -> Option<u32> {
    let age = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !age.is_finite() || age.fract() != 0.0 || age < 1.0 || age > f64::from(u32::MAX) {
        return None;
    }
    Some(age as u32)
}

/// 认证服务
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// 用户注册
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse> {
        let age = parse_age(request.age.as_ref());
        let (Some(name), Some(email), Some(password), Some(age), Some(gender)) = (
            non_empty(request.name),
            non_empty(request.email),
            request.password.filter(|p| !p.is_empty()),
            age,
            non_empty(request.gender),
        ) else {
            return Err(HealthError::Validation("All fields are required".to_string()));
        };

        let email = normalize_email(&email);
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(HealthError::Conflict("User already exists".to_string()));
        }

        let hasher = self.hasher;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| HealthError::Internal(format!("hashing task failed: {}", e)))?;

        let user = User::new(name, email, password_hash, age, gender);
        let response = AuthResponse {
            success: None,
            user_id: user.id,
            name: user.name.clone(),
            redirect: "/".to_string(),
        };

        // 并发注册同一邮箱时由存储层的唯一约束兜底
        self.store.create_user(user).await?;
        Ok(response)
    }

    /// 用户登录，邮箱不存在与密码错误返回相同消息
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let (Some(email), Some(password)) = (
            non_empty(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(HealthError::Validation("Email and password required".to_string()));
        };

        let Some(user) = self.store.find_by_email(&email).await? else {
            info!("Login failed - user not found: {}", email);
            return Err(HealthError::invalid_credentials());
        };

        let hasher = self.hasher;
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| HealthError::Internal(format!("hashing task failed: {}", e)))??;

        if !matches {
            info!("Login failed - wrong password for: {}", user.email);
            return Err(HealthError::invalid_credentials());
        }

        Ok(AuthResponse {
            success: Some(true),
            user_id: user.id,
            name: user.name,
            redirect: "/".to_string(),
        })
    }
}

/// 注册处理器
pub async fn signup_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let auth = AuthService::new(state.store.clone(), state.hasher);

    match auth.signup(request).await {
        Ok(response) => {
            info!("User signed up: {}", response.user_id);
            Ok(Json(response))
        }
        Err(e) => {
            warn!("Signup failed: {}", e);
            Err(e.into())
        }
    }
}

/// 登录处理器
pub async fn login_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let auth = AuthService::new(state.store.clone(), state.hasher);

    let response = auth.login(request).await?;
    info!("Login success: {}", response.user_id);
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthai_database::MemoryUserStore;
    use serde_json::json;

    fn service() -> (AuthService, MemoryUserStore) {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(Arc::new(store.clone()), PasswordHasher::new(1_000));
        (auth, store)
    }

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            name: Some("A".to_string()),
            email: Some(email.to_string()),
            password: Some("p".to_string()),
            age: Some(json!(20)),
            gender: Some("Male".to_string()),
        }
    }

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age(Some(&json!(20))), Some(20));
        assert_eq!(parse_age(Some(&json!("21"))), Some(21));
        assert_eq!(parse_age(Some(&json!(""))), None);
        assert_eq!(parse_age(Some(&json!(0))), None);
        assert_eq!(parse_age(Some(&json!(-4))), None);
        assert_eq!(parse_age(Some(&json!(20.0))), Some(20));
        assert_eq!(parse_age(Some(&json!("19.0"))), Some(19));
        assert_eq!(parse_age(Some(&json!(20.5))), None);
        assert_eq!(parse_age(Some(&json!("abc"))), None);
        assert_eq!(parse_age(None), None);
    }

    #[tokio::test]
    async fn test_signup_then_login_returns_same_id() {
        let (auth, _) = service();
        let signed_up = auth.signup(signup_request("a@x.com")).await.unwrap();

        let logged_in = auth
            .login(LoginRequest {
                email: Some("A@x.com".to_string()),
                password: Some("p".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(signed_up.user_id, logged_in.user_id);
        assert_eq!(logged_in.success, Some(true));
    }

    #[tokio::test]
    async fn test_signup_requires_all_fields() {
        let (auth, store) = service();
        let mut request = signup_request("a@x.com");
        request.gender = None;

        let err = auth.signup(request).await.unwrap_err();
        assert!(matches!(err, HealthError::Validation(ref m) if m == "All fields are required"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts() {
        let (auth, store) = service();
        auth.signup(signup_request("a@x.com")).await.unwrap();

        let err = auth.signup(signup_request("a@x.com")).await.unwrap_err();
        assert!(matches!(err, HealthError::Conflict(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_login_errors_do_not_leak() {
        let (auth, _) = service();
        auth.signup(signup_request("a@x.com")).await.unwrap();

        let wrong_password = auth
            .login(LoginRequest {
                email: Some("a@x.com".to_string()),
                password: Some("nope".to_string()),
            })
            .await
            .unwrap_err();
        let unknown_email = auth
            .login(LoginRequest {
                email: Some("b@x.com".to_string()),
                password: Some("p".to_string()),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, HealthError::Auth(_)));
    }

    #[tokio::test]
    async fn test_stored_password_is_hashed() {
        let (auth, store) = service();
        let response = auth.signup(signup_request("a@x.com")).await.unwrap();

        let user = store.find_by_id(&response.user_id).await.unwrap().unwrap();
        assert_ne!(user.password_hash, "p");
        assert!(user.password_hash.starts_with("pbkdf2-sha256$"));
    }
}
