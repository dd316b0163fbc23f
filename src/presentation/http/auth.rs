use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bootstrap::app_context::AppContext;
use crate::domain::security::AuthUser;
use crate::presentation::http::proxy_fix::ForwardedInfo;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<AuthUser> for UserResponse {
    fn from(u: AuthUser) -> Self {
        UserResponse {
            id: u.id,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            roles: u.roles,
            last_login: u.last_login,
        }
    }
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new().route("/login", post(login)).with_state(ctx)
}

#[utoipa::path(post, path = "/login", tag = "Auth", request_body = LoginRequest, responses(
    (status = 200, body = UserResponse),
    (status = 401, description = "Invalid credentials")
))]
pub async fn login(
    State(ctx): State<AppContext>,
    forwarded: Option<Extension<ForwardedInfo>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserResponse>, StatusCode> {
    let client = forwarded.and_then(|Extension(info)| info.client_addr);
    let sm = ctx.security_manager();
    let user = sm
        .authenticate(&req.username, &req.password)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "login_failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    match user {
        Some(user) => {
            tracing::info!(username = %user.username, client = ?client, "login_ok");
            Ok(Json(user.into()))
        }
        None => {
            tracing::info!(username = %req.username, client = ?client, "login_rejected");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
