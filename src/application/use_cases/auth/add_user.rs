use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString},
};
use password_hash::rand_core::OsRng;

use crate::application::ports::user_repository::{NewUserRow, UserRepository};
use crate::domain::security::{AuthUser, NewUser};

pub struct AddUser<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: UserRepository + ?Sized> AddUser<'a, R> {
    pub async fn execute(&self, req: &NewUser) -> anyhow::Result<AuthUser> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .to_string();
        self.repo.ensure_role(&req.role).await?;
        let row = self
            .repo
            .create_user(NewUserRow {
                username: &req.username,
                first_name: &req.first_name,
                last_name: &req.last_name,
                email: &req.email,
                password_hash: &hash,
            })
            .await?;
        self.repo.assign_role(row.id, &req.role).await?;
        let roles = self.repo.roles_for(row.id).await?;
        Ok(AuthUser {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            active: row.active,
            roles,
            last_login: row.last_login,
        })
    }
}
