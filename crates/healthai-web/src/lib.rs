//! HealthAI HTTP接口

pub mod ai;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod predict;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use metrics::Metrics;
pub use predict::{AutoSaveOutcome, AUTOSAVE_HEADER, USER_ID_HEADER};
pub use server::{create_app, WebServer};
pub use state::AppState;
