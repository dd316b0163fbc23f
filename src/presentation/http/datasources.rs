use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::bootstrap::app_context::AppContext;
use crate::domain::datasource::DatasourceRecord;
use crate::presentation::http::cached_view::{CachedView, cached_view};

#[derive(Debug, Serialize, ToSchema)]
pub struct DatasourceItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub datasource_type: String,
    pub name: String,
    pub full_name: String,
    pub schema: Option<String>,
    pub database_name: Option<String>,
    pub description: Option<String>,
}

impl From<DatasourceRecord> for DatasourceItem {
    fn from(r: DatasourceRecord) -> Self {
        DatasourceItem {
            full_name: r.full_name(),
            id: r.id,
            datasource_type: r.datasource_type,
            name: r.name,
            schema: r.schema,
            database_name: r.database_name,
            description: r.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DatasourceListResponse {
    pub types: Vec<String>,
    pub items: Vec<DatasourceItem>,
}

pub fn routes(ctx: AppContext) -> Router {
    let view = CachedView::new(ctx.cache(), None);
    Router::new()
        .route("/vista/datasources", get(list_datasources))
        .route_layer(middleware::from_fn_with_state(view, cached_view))
        .route("/vista/datasources/:datasource_type/:id", get(get_datasource))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/vista/datasources", tag = "Datasources",
    responses((status = 200, body = DatasourceListResponse)))]
pub async fn list_datasources(
    State(ctx): State<AppContext>,
) -> Result<Json<DatasourceListResponse>, StatusCode> {
    let sources = ctx.sources();
    let records = sources.get_all_datasources().await.map_err(|e| {
        tracing::error!(error = ?e, "list_datasources_failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(DatasourceListResponse {
        types: sources.types().into_iter().map(String::from).collect(),
        items: records.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(get, path = "/vista/datasources/{datasource_type}/{id}", tag = "Datasources",
    params(
        ("datasource_type" = String, Path, description = "Registered datasource type"),
        ("id" = i64, Path, description = "Datasource id")
    ),
    responses((status = 200, body = DatasourceItem), (status = 404)))]
pub async fn get_datasource(
    State(ctx): State<AppContext>,
    Path((datasource_type, id)): Path<(String, i64)>,
) -> Result<Json<DatasourceItem>, StatusCode> {
    if ctx.sources().get(&datasource_type).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let record = ctx
        .datasource(&datasource_type, id)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, datasource_type, id, "get_datasource_failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(record.into()))
}
