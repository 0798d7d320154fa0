//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::ai::{process_symptoms, symptom_check};
use crate::auth::{login_handler, signup_handler};
use crate::dashboard::{add_test_result, get_dashboard, get_test_results, update_profile};
use crate::handlers::{api_root, health, metrics};
use crate::predict::predict_handler;
use crate::state::AppState;

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState, max_upload_bytes: usize) -> Self {
        let app = create_app(state, max_upload_bytes);

        Self { addr, app }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start web server: {}", e))?;

        Ok(())
    }
}

/// 构建完整路由
pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // 根路径
        .route("/", get(api_root))
        // 健康检查
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api", api_routes())
        .with_state(state)
        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(max_upload_bytes))
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// /api 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/dashboard/user/:id", get(get_dashboard))
        .route("/dashboard/user/:id/profile", put(update_profile))
        .route("/dashboard/user/:id/test-result", post(add_test_result))
        .route("/dashboard/user/:id/test-results", get(get_test_results))
        .route("/ai/symptom-check", post(symptom_check))
        .route("/predict/:disease", post(predict_handler))
        .route("/process-symptoms", post(process_symptoms))
}
