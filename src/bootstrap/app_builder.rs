use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::ports::security_manager::SecurityManager;
use crate::bootstrap::app_context::AppContext;
use crate::infrastructure::db::PgPool;
use crate::presentation::http::index;

pub const DEFAULT_BASE_TEMPLATE: &str = "vista/base.html";
pub const MENU_PATH: &str = "/vista/menu";

struct View {
    name: String,
    category: String,
    router: Router,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuCategory {
    pub category: String,
    pub views: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuResponse {
    pub app_name: String,
    pub base_template: String,
    pub welcome_path: String,
    pub security_manager: String,
    pub menu: Vec<MenuCategory>,
}

/// Admin layer: the index view plus every registered view, grouped into
/// menu categories, behind one security manager.
pub struct AppBuilder {
    ctx: AppContext,
    base_template: String,
    index_view: Router,
    views: Vec<View>,
}

impl AppBuilder {
    pub fn new(ctx: AppContext) -> Self {
        let index_view = index::routes(ctx.clone());
        Self {
            ctx,
            base_template: DEFAULT_BASE_TEMPLATE.to_string(),
            index_view,
            views: Vec::new(),
        }
    }

    pub fn with_base_template(mut self, template: impl Into<String>) -> Self {
        self.base_template = template.into();
        self
    }

    /// Replaces the view served at `/`.
    pub fn with_index_view(mut self, router: Router) -> Self {
        self.index_view = router;
        self
    }

    pub fn add_view(&mut self, name: &str, category: &str, router: Router) -> &mut Self {
        tracing::debug!(view = name, category, "view_registered");
        self.views.push(View {
            name: name.to_owned(),
            category: category.to_owned(),
            router,
        });
        self
    }

    pub fn get_session(&self) -> PgPool {
        self.ctx.pool()
    }

    pub fn security_manager(&self) -> Arc<dyn SecurityManager> {
        self.ctx.security_manager()
    }

    /// Categories in first-registration order.
    pub fn menu(&self) -> Vec<MenuCategory> {
        let mut menu: Vec<MenuCategory> = Vec::new();
        for view in &self.views {
            match menu.iter_mut().find(|c| c.category == view.category) {
                Some(cat) => cat.views.push(view.name.clone()),
                None => menu.push(MenuCategory {
                    category: view.category.clone(),
                    views: vec![view.name.clone()],
                }),
            }
        }
        menu
    }

    pub fn into_router(self) -> Router {
        let menu = Arc::new(MenuResponse {
            app_name: self.ctx.cfg.app_name.clone(),
            base_template: self.base_template.clone(),
            welcome_path: self.ctx.cfg.welcome_path.clone(),
            security_manager: self.ctx.security_manager().name().to_owned(),
            menu: self.menu(),
        });
        let mut router = Router::new()
            .merge(self.index_view)
            .route(MENU_PATH, get(menu_view).with_state(menu));
        for view in self.views {
            router = router.merge(view.router);
        }
        router
    }
}

#[utoipa::path(get, path = "/vista/menu", tag = "Index", responses((status = 200, body = MenuResponse)))]
pub async fn menu_view(State(menu): State<Arc<MenuResponse>>) -> Json<MenuResponse> {
    Json(menu.as_ref().clone())
}
