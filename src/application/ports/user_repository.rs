use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub active: bool,
    pub password_hash: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUserRow<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUserRow<'_>) -> anyhow::Result<UserRow>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<UserRow>>;
    /// Stamps `last_login` with the current time and returns it.
    async fn record_login(&self, user_id: i64) -> anyhow::Result<DateTime<Utc>>;
    async fn roles_for(&self, user_id: i64) -> anyhow::Result<Vec<String>>;
    async fn ensure_role(&self, name: &str) -> anyhow::Result<()>;
    async fn assign_role(&self, user_id: i64, role: &str) -> anyhow::Result<()>;
    async fn has_permission(
        &self,
        user_id: i64,
        permission: &str,
        view_menu: &str,
    ) -> anyhow::Result<bool>;
}
