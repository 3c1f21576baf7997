//! Program context: the injected engine plus the program's exports.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::engine::ResourceEngine;
use crate::error::OutputError;
use crate::output::Output;

/// Handle passed to every component constructor.
#[derive(Clone)]
pub struct Context {
    engine: Arc<dyn ResourceEngine>,
    exports: Arc<RwLock<BTreeMap<String, Output<Value>>>>,
}

impl Context {
    pub fn new(engine: Arc<dyn ResourceEngine>) -> Self {
        Self {
            engine,
            exports: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn engine(&self) -> &dyn ResourceEngine {
        self.engine.as_ref()
    }

    /// Shared handle to the engine, for values that outlive the declaration.
    pub fn engine_handle(&self) -> Arc<dyn ResourceEngine> {
        self.engine.clone()
    }

    /// Export a value under `key`. A later export with the same key wins.
    pub fn export<T>(&self, key: impl Into<String>, output: &Output<T>)
    where
        T: Clone + Serialize + Send + Sync + 'static,
    {
        let key = key.into();
        debug!("Exporting {}", key);
        self.exports.write().insert(key, output.to_value());
    }

    /// Names of everything exported so far.
    pub fn export_keys(&self) -> Vec<String> {
        self.exports.read().keys().cloned().collect()
    }

    /// Wait for every export to resolve.
    pub async fn resolve_exports(&self) -> Result<BTreeMap<String, Value>, OutputError> {
        let exports: Vec<(String, Output<Value>)> = self
            .exports
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut resolved = BTreeMap::new();
        for (key, output) in exports {
            resolved.insert(key, output.resolve().await?);
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("exports", &self.export_keys())
            .finish_non_exhaustive()
    }
}
