use async_trait::async_trait;

use super::record_from_row;
use crate::application::ports::datasource_type::DatasourceType;
use crate::domain::datasource::DatasourceRecord;
use crate::infrastructure::db::PgPool;

pub const CLASS_NAME: &str = "SqlaTable";
pub const TYPE_NAME: &str = "table";

const SELECT_TABLES: &str = r#"SELECT t.id, t.table_name AS name, t.schema,
          d.database_name, t.description, t.perm
   FROM tables t
   LEFT JOIN dbs d ON d.id = t.database_id"#;

/// Tables registered against a SQL database.
pub struct SqlxTableSource {
    pub pool: PgPool,
}

impl SqlxTableSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatasourceType for SqlxTableSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<DatasourceRecord>> {
        let row = sqlx::query(&format!("{SELECT_TABLES} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| record_from_row(&r, TYPE_NAME)))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<DatasourceRecord>> {
        let rows = sqlx::query(&format!("{SELECT_TABLES} ORDER BY t.table_name ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| record_from_row(r, TYPE_NAME)).collect())
    }

    async fn get_by_name(
        &self,
        name: &str,
        schema: Option<&str>,
        database_name: &str,
    ) -> anyhow::Result<Option<DatasourceRecord>> {
        let row = sqlx::query(&format!(
            "{SELECT_TABLES} WHERE t.table_name = $1 AND t.schema IS NOT DISTINCT FROM $2 AND d.database_name = $3"
        ))
        .bind(name)
        .bind(schema)
        .bind(database_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| record_from_row(&r, TYPE_NAME)))
    }
}
