use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};

use crate::application::ports::user_repository::UserRepository;
use crate::domain::security::AuthUser;

pub struct Login<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl<'a, R: UserRepository + ?Sized> Login<'a, R> {
    /// `None` for unknown users, inactive users and wrong passwords.
    pub async fn execute(&self, req: &LoginRequest) -> anyhow::Result<Option<AuthUser>> {
        let row = match self.repo.find_by_username(&req.username).await? {
            Some(r) if r.active => r,
            _ => return Ok(None),
        };
        let Some(hash) = row.password_hash.as_deref() else {
            return Ok(None);
        };
        let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        if Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }
        let last_login = self.repo.record_login(row.id).await?;
        let roles = self.repo.roles_for(row.id).await?;
        Ok(Some(AuthUser {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            active: row.active,
            roles,
            last_login: Some(last_login),
        }))
    }
}
