use async_trait::async_trait;

use crate::domain::security::{AuthUser, NewUser};

#[async_trait]
pub trait SecurityManager: Send + Sync {
    fn name(&self) -> &str;

    /// Makes sure the builtin roles exist.
    async fn sync_roles(&self) -> anyhow::Result<()>;

    async fn authenticate(&self, username: &str, password: &str)
    -> anyhow::Result<Option<AuthUser>>;

    async fn has_permission(
        &self,
        user: &AuthUser,
        permission: &str,
        view_menu: &str,
    ) -> anyhow::Result<bool>;

    async fn add_user(&self, user: &NewUser) -> anyhow::Result<AuthUser>;
}
