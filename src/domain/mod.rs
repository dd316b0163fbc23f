pub mod datasource;
pub mod security;
