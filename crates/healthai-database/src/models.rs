//! 数据库模型

use chrono::{DateTime, Utc};
use healthai_core::models::User;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

// 用户以JSONB文档整体存储，email单独成列用于唯一约束

/// 数据库用户表
#[derive(Debug, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub document: Json<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(db_user: DbUser) -> Self {
        let mut user = db_user.document.0;
        // 列值为准
        user.id = db_user.id;
        user.email = db_user.email;
        user
    }
}
