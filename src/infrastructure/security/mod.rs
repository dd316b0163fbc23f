use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::ports::security_manager::SecurityManager;
use crate::application::ports::user_repository::UserRepository;

pub mod db_security_manager;

pub const DEFAULT_SECURITY_MANAGER: &str = "db";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SecurityManagerError {
    #[error("unknown security manager `{0}`")]
    Unknown(String),
}

pub type SecurityManagerFactory =
    Arc<dyn Fn(Arc<dyn UserRepository>) -> Arc<dyn SecurityManager> + Send + Sync>;

/// Named security manager implementations selectable from config.
#[derive(Clone, Default)]
pub struct SecurityManagerRegistry {
    factories: BTreeMap<String, SecurityManagerFactory>,
}

impl SecurityManagerRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(DEFAULT_SECURITY_MANAGER, |repo| {
            Arc::new(db_security_manager::DbSecurityManager::new(repo))
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(Arc<dyn UserRepository>) -> Arc<dyn SecurityManager> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_owned(), Arc::new(factory));
        self
    }

    /// `None` selects the default manager.
    pub fn resolve(
        &self,
        name: Option<&str>,
        repo: Arc<dyn UserRepository>,
    ) -> Result<Arc<dyn SecurityManager>, SecurityManagerError> {
        let name = name.unwrap_or(DEFAULT_SECURITY_MANAGER);
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SecurityManagerError::Unknown(name.to_owned()))?;
        Ok(factory(repo))
    }
}
