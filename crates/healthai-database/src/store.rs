//! 用户文档存储
//!
//! `UserStore` 是所有业务组件依赖的存储接口，提供内存和PostgreSQL两种实现。

use async_trait::async_trait;
use healthai_core::utils::normalize_email;
use healthai_core::{HealthError, ProfileUpdate, Result, TestResult, User};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::connection::DatabasePool;
use crate::queries::DatabaseQueries;

/// 用户存储接口
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 创建用户，邮箱已存在时返回 `Conflict`
    async fn create_user(&self, user: User) -> Result<()>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// 部分更新资料，返回更新后的文档
    async fn update_profile(&self, id: &Uuid, update: ProfileUpdate) -> Result<User>;

    /// 追加检测结果并覆盖 `last_scan`
    async fn append_test_result(&self, id: &Uuid, result: TestResult) -> Result<User>;

    async fn list_test_results(&self, id: &Uuid) -> Result<Vec<TestResult>> {
        self.find_by_id(id)
            .await?
            .map(|user| user.test_results)
            .ok_or_else(HealthError::user_not_found)
    }
}

#[derive(Default)]
struct MemoryInner {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
}

/// 内存存储，写锁串行化同一文档的修改
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, mut user: User) -> Result<()> {
        user.email = normalize_email(&user.email);

        let mut inner = self.inner.write().await;
        if inner.emails.contains_key(&user.email) {
            return Err(HealthError::Conflict("User already exists".to_string()));
        }

        debug!("Creating user {} in memory store", user.id);
        inner.emails.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user);
        Ok(())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(&normalize_email(email))
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn update_profile(&self, id: &Uuid, update: ProfileUpdate) -> Result<User> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(id)
            .ok_or_else(HealthError::user_not_found)?;

        update.apply(user);
        Ok(user.clone())
    }

    async fn append_test_result(&self, id: &Uuid, result: TestResult) -> Result<User> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(id)
            .ok_or_else(HealthError::user_not_found)?;

        user.append_test_result(result);
        Ok(user.clone())
    }
}

/// PostgreSQL存储，用户文档存为JSONB
#[derive(Clone)]
pub struct PgUserStore {
    pool: DatabasePool,
}

impl PgUserStore {
    /// 连接并建表
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = DatabasePool::new(url, max_connections).await?;
        DatabaseQueries::new(&pool).create_tables().await?;
        Ok(Self { pool })
    }

    fn queries(&self) -> DatabaseQueries<'_> {
        DatabaseQueries::new(&self.pool)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, mut user: User) -> Result<()> {
        user.email = normalize_email(&user.email);
        self.queries().insert_user(&user).await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        self.queries().get_user_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.queries()
            .get_user_by_email(&normalize_email(email))
            .await
    }

    async fn update_profile(&self, id: &Uuid, update: ProfileUpdate) -> Result<User> {
        self.queries()
            .modify_user(id, move |user| update.apply(user))
            .await?
            .ok_or_else(HealthError::user_not_found)
    }

    async fn append_test_result(&self, id: &Uuid, result: TestResult) -> Result<User> {
        self.queries()
            .modify_user(id, move |user| user.append_test_result(result))
            .await?
            .ok_or_else(HealthError::user_not_found)
    }
}
