use serde::{Deserialize, Serialize};

/// A queryable source as exposed by a registered datasource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceRecord {
    pub id: i64,
    pub datasource_type: String,
    pub name: String,
    pub schema: Option<String>,
    pub database_name: Option<String>,
    pub description: Option<String>,
    pub perm: Option<String>,
}

impl DatasourceRecord {
    /// `[database].[name]`, the label used in permission names.
    pub fn full_name(&self) -> String {
        match (&self.database_name, &self.schema) {
            (Some(db), Some(schema)) => format!("[{db}].[{schema}].[{}]", self.name),
            (Some(db), None) => format!("[{db}].[{}]", self.name),
            _ => format!("[{}]", self.name),
        }
    }
}

/// Identifies one datasource of one registered type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasourceRef {
    pub datasource_type: String,
    pub id: i64,
}
