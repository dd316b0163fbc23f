use async_trait::async_trait;

use super::record_from_row;
use crate::application::ports::datasource_type::DatasourceType;
use crate::domain::datasource::DatasourceRecord;
use crate::infrastructure::db::PgPool;

pub const CLASS_NAME: &str = "DruidDatasource";
pub const TYPE_NAME: &str = "druid";

// Druid datasources have no schema; the cluster plays the database role.
const SELECT_DATASOURCES: &str = r#"SELECT ds.id, ds.datasource_name AS name,
          NULL::TEXT AS schema, ds.cluster_name AS database_name,
          ds.description, ds.perm
   FROM datasources ds"#;

pub struct SqlxDruidSource {
    pub pool: PgPool,
}

impl SqlxDruidSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatasourceType for SqlxDruidSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<DatasourceRecord>> {
        let row = sqlx::query(&format!("{SELECT_DATASOURCES} WHERE ds.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| record_from_row(&r, TYPE_NAME)))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<DatasourceRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_DATASOURCES} ORDER BY ds.datasource_name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| record_from_row(r, TYPE_NAME)).collect())
    }

    async fn get_by_name(
        &self,
        name: &str,
        _schema: Option<&str>,
        database_name: &str,
    ) -> anyhow::Result<Option<DatasourceRecord>> {
        let row = sqlx::query(&format!(
            "{SELECT_DATASOURCES} WHERE ds.datasource_name = $1 AND ds.cluster_name = $2"
        ))
        .bind(name)
        .bind(database_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| record_from_row(&r, TYPE_NAME)))
    }
}
