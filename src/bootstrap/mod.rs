pub mod app;
pub mod app_builder;
pub mod app_context;
pub mod config;
pub mod logging;
pub mod uploads;
