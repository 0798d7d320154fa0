//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::DbUser;
use healthai_core::{Result, User};
use sqlx::types::Json;
use uuid::Uuid;

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(320) UNIQUE NOT NULL,
                document JSONB NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 插入新用户，邮箱重复时映射为冲突错误
    pub async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
        "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(Json(user))
        .bind(user.created_at)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    /// 根据ID查找用户
    pub async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(result.map(User::from))
    }

    /// 根据邮箱查找用户
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(result.map(User::from))
    }

    /// 行锁内读-改-写，保证同一文档的写入串行
    pub async fn modify_user<F>(&self, id: &Uuid, modify: F) -> Result<Option<User>>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut tx = self.pool.pool().begin().await?;

        let row = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut user = User::from(row);
        modify(&mut user);

        sqlx::query("UPDATE users SET document = $1, updated_at = NOW() WHERE id = $2")
            .bind(Json(&user))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(user))
    }
}
