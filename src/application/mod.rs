pub mod ports;
pub mod services;
pub mod source_registry;
pub mod use_cases;
