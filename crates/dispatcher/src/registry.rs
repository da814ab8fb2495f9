//! OperationRegistry - named operations a node can execute

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{AffectedItems, Kwargs, Operation};
use tracing::{debug, instrument};

use crate::error::DispatchError;

/// Operations by name
#[derive(Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under its own name, replacing any previous one
    pub fn register<O: Operation + 'static>(&mut self, operation: O) {
        self.register_arc(Arc::new(operation));
    }

    pub fn register_arc(&mut self, operation: Arc<dyn Operation>) {
        debug!(operation = operation.name(), "Operation registered");
        self.operations
            .insert(operation.name().to_string(), operation);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Execute `name` in-process
    #[instrument(name = "registry_invoke", skip(self, kwargs))]
    pub async fn invoke(&self, name: &str, kwargs: Kwargs) -> Result<AffectedItems, DispatchError> {
        let operation = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownOperation {
                name: name.to_string(),
            })?;
        Ok(operation.execute(kwargs).await?)
    }
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.names())
            .finish()
    }
}
