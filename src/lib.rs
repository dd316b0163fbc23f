// Module layout (Clean Architecture style)
// - bootstrap: configuration, logging and app assembly
// - infrastructure: DB/cache/datasource/security adapters
// - presentation: HTTP handlers and middleware
// - application: ports, caching and the datasource registry
// - domain: core models

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
