pub mod cache;
pub mod datasources;
pub mod db;
pub mod security;
