pub mod cache_backend;
pub mod datasource_type;
pub mod security_manager;
pub mod user_repository;
