use std::sync::Arc;

use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::application::source_registry::DatasourceCatalog;
use crate::bootstrap::config::DEFAULT_DS_MODULE;
use crate::domain::datasource::DatasourceRecord;
use crate::infrastructure::db::PgPool;

pub mod druid_datasource_sqlx;
pub mod sqla_table_sqlx;

/// Catalog of the datasource classes shipped with the server.
pub fn builtin_catalog(pool: PgPool) -> DatasourceCatalog {
    let mut catalog = DatasourceCatalog::new();
    let tables_pool = pool.clone();
    catalog
        .add_class(DEFAULT_DS_MODULE, sqla_table_sqlx::CLASS_NAME, move || {
            Arc::new(sqla_table_sqlx::SqlxTableSource::new(tables_pool.clone()))
        })
        .add_class(DEFAULT_DS_MODULE, druid_datasource_sqlx::CLASS_NAME, move || {
            Arc::new(druid_datasource_sqlx::SqlxDruidSource::new(pool.clone()))
        });
    catalog
}

fn record_from_row(row: &PgRow, datasource_type: &str) -> DatasourceRecord {
    DatasourceRecord {
        id: row.get("id"),
        datasource_type: datasource_type.to_owned(),
        name: row.get("name"),
        schema: row.get("schema"),
        database_name: row.get("database_name"),
        description: row.get("description"),
        perm: row.get("perm"),
    }
}
