use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::application::ports::user_repository::{NewUserRow, UserRepository, UserRow};
use crate::infrastructure::db::PgPool;

pub struct SqlxUserRepository {
    pub pool: PgPool,
}

impl SqlxUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(r: &PgRow) -> UserRow {
    UserRow {
        id: r.get("id"),
        username: r.get("username"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        email: r.get("email"),
        active: r.get("active"),
        password_hash: r.try_get("password").ok(),
        last_login: r.get("last_login"),
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_user(&self, user: NewUserRow<'_>) -> anyhow::Result<UserRow> {
        let row = sqlx::query(
            r#"INSERT INTO ab_user (username, first_name, last_name, email, password, active)
               VALUES ($1, $2, $3, $4, $5, TRUE)
               RETURNING id, username, first_name, last_name, email, active, password, last_login"#,
        )
        .bind(user.username)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user_from_row(&row))
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<UserRow>> {
        let row = sqlx::query(
            r#"SELECT id, username, first_name, last_name, email, active, password, last_login
               FROM ab_user WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn record_login(&self, user_id: i64) -> anyhow::Result<DateTime<Utc>> {
        let at: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE ab_user SET last_login = now() WHERE id = $1 RETURNING last_login",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(at)
    }

    async fn roles_for(&self, user_id: i64) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query(
            r#"SELECT r.name FROM ab_user_role ur
               JOIN ab_role r ON r.id = ur.role_id
               WHERE ur.user_id = $1
               ORDER BY r.name ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("name")).collect())
    }

    async fn ensure_role(&self, name: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO ab_role (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn assign_role(&self, user_id: i64, role: &str) -> anyhow::Result<()> {
        let res = sqlx::query(
            r#"INSERT INTO ab_user_role (user_id, role_id)
               SELECT $1, r.id FROM ab_role r WHERE r.name = $2
               ON CONFLICT DO NOTHING"#,
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            tracing::debug!(user_id, role, "role_assignment_noop");
        }
        Ok(())
    }

    async fn has_permission(
        &self,
        user_id: i64,
        permission: &str,
        view_menu: &str,
    ) -> anyhow::Result<bool> {
        let found: Option<i32> = sqlx::query_scalar(
            r#"SELECT 1 FROM ab_user_role ur
               JOIN ab_permission_view_role pvr ON pvr.role_id = ur.role_id
               JOIN ab_permission_view pv ON pv.id = pvr.permission_view_id
               JOIN ab_permission p ON p.id = pv.permission_id
               JOIN ab_view_menu vm ON vm.id = pv.view_menu_id
               WHERE ur.user_id = $1 AND p.name = $2 AND vm.name = $3
               LIMIT 1"#,
        )
        .bind(user_id)
        .bind(permission)
        .bind(view_menu)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }
}
