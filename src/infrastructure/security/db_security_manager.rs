use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::security_manager::SecurityManager;
use crate::application::ports::user_repository::UserRepository;
use crate::application::use_cases::auth::add_user::AddUser;
use crate::application::use_cases::auth::login::{Login, LoginRequest};
use crate::domain::security::{AuthUser, BUILTIN_ROLES, NewUser};

/// Security manager backed by the `ab_*` user/role/permission tables.
pub struct DbSecurityManager {
    repo: Arc<dyn UserRepository>,
}

impl DbSecurityManager {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl SecurityManager for DbSecurityManager {
    fn name(&self) -> &str {
        "db"
    }

    async fn sync_roles(&self) -> anyhow::Result<()> {
        for role in BUILTIN_ROLES {
            self.repo.ensure_role(role).await?;
        }
        tracing::info!(roles = ?BUILTIN_ROLES, "security_roles_synced");
        Ok(())
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> anyhow::Result<Option<AuthUser>> {
        let uc = Login {
            repo: self.repo.as_ref(),
        };
        uc.execute(&LoginRequest {
            username: username.to_owned(),
            password: password.to_owned(),
        })
        .await
    }

    async fn has_permission(
        &self,
        user: &AuthUser,
        permission: &str,
        view_menu: &str,
    ) -> anyhow::Result<bool> {
        if !user.active {
            return Ok(false);
        }
        if user.is_admin() {
            return Ok(true);
        }
        self.repo.has_permission(user.id, permission, view_menu).await
    }

    async fn add_user(&self, user: &NewUser) -> anyhow::Result<AuthUser> {
        let uc = AddUser {
            repo: self.repo.as_ref(),
        };
        uc.execute(user).await
    }
}
