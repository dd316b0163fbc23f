pub mod auth;
pub mod cached_view;
pub mod cors;
pub mod datasources;
pub mod health;
pub mod index;
pub mod middleware;
pub mod proxy_fix;
