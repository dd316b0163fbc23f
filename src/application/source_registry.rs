use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::ports::datasource_type::DatasourceType;
use crate::domain::datasource::DatasourceRecord;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("datasource module `{0}` is not available")]
    UnknownModule(String),
    #[error("datasource class `{class}` not found in module `{module}`")]
    UnknownClass { module: String, class: String },
}

pub type DatasourceFactory = Arc<dyn Fn() -> Arc<dyn DatasourceType> + Send + Sync>;

/// Datasource implementations the process can load, addressed by
/// module name and class name.
#[derive(Default, Clone)]
pub struct DatasourceCatalog {
    modules: BTreeMap<String, BTreeMap<String, DatasourceFactory>>,
}

impl DatasourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class<F>(&mut self, module: &str, class: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn DatasourceType> + Send + Sync + 'static,
    {
        self.modules
            .entry(module.to_owned())
            .or_default()
            .insert(class.to_owned(), Arc::new(factory));
        self
    }

    pub fn resolve(&self, module: &str, class: &str) -> Result<Arc<dyn DatasourceType>, RegistryError> {
        let classes = self
            .modules
            .get(module)
            .ok_or_else(|| RegistryError::UnknownModule(module.to_owned()))?;
        let factory = classes
            .get(class)
            .ok_or_else(|| RegistryError::UnknownClass {
                module: module.to_owned(),
                class: class.to_owned(),
            })?;
        Ok(factory())
    }
}

/// Registered datasource types, keyed by their type name.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn DatasourceType>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every `module -> [class]` entry and registers the result
    /// under its type name. Nothing is registered if any entry fails.
    pub fn register_sources(
        &mut self,
        catalog: &DatasourceCatalog,
        module_datasource_map: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), RegistryError> {
        let mut resolved = Vec::new();
        for (module, classes) in module_datasource_map {
            for class in classes {
                resolved.push(catalog.resolve(module, class)?);
            }
        }
        for source in resolved {
            let type_name = source.type_name();
            if self.sources.contains_key(type_name) {
                tracing::debug!(type_name, class = source.class_name(), "datasource_type_replaced");
            }
            tracing::info!(type_name, class = source.class_name(), "datasource_registered");
            self.sources.insert(type_name.to_owned(), source);
        }
        Ok(())
    }

    pub fn get(&self, datasource_type: &str) -> Option<Arc<dyn DatasourceType>> {
        self.sources.get(datasource_type).cloned()
    }

    pub fn types(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Unknown types read as missing datasources.
    pub async fn get_datasource(
        &self,
        datasource_type: &str,
        id: i64,
    ) -> anyhow::Result<Option<DatasourceRecord>> {
        match self.get(datasource_type) {
            Some(source) => source.get(id).await,
            None => {
                tracing::debug!(datasource_type, "unknown_datasource_type");
                Ok(None)
            }
        }
    }

    pub async fn get_all_datasources(&self) -> anyhow::Result<Vec<DatasourceRecord>> {
        let mut all = Vec::new();
        for source in self.sources.values() {
            all.extend(source.list_all().await?);
        }
        Ok(all)
    }

    pub async fn get_datasource_by_name(
        &self,
        datasource_type: &str,
        name: &str,
        schema: Option<&str>,
        database_name: &str,
    ) -> anyhow::Result<Option<DatasourceRecord>> {
        match self.get(datasource_type) {
            Some(source) => source.get_by_name(name, schema, database_name).await,
            None => Ok(None),
        }
    }
}
