//! # HealthAI数据库模块
//!
//! 负责用户文档的存储和管理，提供内存存储和PostgreSQL（JSONB文档）存储两种实现。

pub mod connection;
pub mod models;
pub mod queries;
pub mod store;

// 重新导出主要类型
pub use connection::DatabasePool;
pub use models::*;
pub use queries::DatabaseQueries;
pub use store::{MemoryUserStore, PgUserStore, UserStore};
