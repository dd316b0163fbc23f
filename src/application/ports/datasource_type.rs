use async_trait::async_trait;

use crate::domain::datasource::DatasourceRecord;

/// One pluggable datasource implementation (a "datasource class").
#[async_trait]
pub trait DatasourceType: Send + Sync {
    /// Registry key, e.g. `table` or `druid`.
    fn type_name(&self) -> &'static str;

    fn class_name(&self) -> &'static str;

    async fn get(&self, id: i64) -> anyhow::Result<Option<DatasourceRecord>>;

    async fn list_all(&self) -> anyhow::Result<Vec<DatasourceRecord>>;

    async fn get_by_name(
        &self,
        name: &str,
        schema: Option<&str>,
        database_name: &str,
    ) -> anyhow::Result<Option<DatasourceRecord>>;
}
