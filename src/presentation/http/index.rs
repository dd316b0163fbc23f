use axum::{
    Json, Router,
    extract::State,
    response::Redirect,
    routing::get,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::bootstrap::app_context::AppContext;

#[derive(Debug, Serialize, ToSchema)]
pub struct WelcomeResp {
    pub app_name: String,
    pub version: &'static str,
    pub datasource_types: Vec<String>,
}

/// Index view: `/` goes to the welcome page.
pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(index))
        .with_state(ctx)
}

pub fn welcome_routes(ctx: AppContext) -> Router {
    let path = ctx.cfg.welcome_path.clone();
    Router::new().route(&path, get(welcome)).with_state(ctx)
}

#[utoipa::path(get, path = "/", tag = "Index", responses((status = 303, description = "Redirect to the welcome page")))]
pub async fn index(State(ctx): State<AppContext>) -> Redirect {
    Redirect::to(&ctx.cfg.welcome_path)
}

#[utoipa::path(get, path = "/vista/welcome", tag = "Index", responses((status = 200, body = WelcomeResp)))]
pub async fn welcome(State(ctx): State<AppContext>) -> Json<WelcomeResp> {
    let sources = ctx.sources();
    Json(WelcomeResp {
        app_name: ctx.cfg.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        datasource_types: sources.types().into_iter().map(String::from).collect(),
    })
}
