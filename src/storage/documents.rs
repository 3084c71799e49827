use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::core::EcfResult;

/// Base de documentos JSON agrupados por colección, al estilo
/// `coleccion/id`. Cada `set` reemplaza el documento completo.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> EcfResult<Option<Value>>;

    async fn set(&self, collection: &str, id: &str, data: Value) -> EcfResult<()>;

    /// Documentos de la colección en orden de id.
    async fn list(&self, collection: &str) -> EcfResult<Vec<Value>>;

    /// Devuelve `true` si el documento existía.
    async fn delete(&self, collection: &str, id: &str) -> EcfResult<bool>;
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> EcfResult<Option<Value>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> EcfResult<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    async fn list(&self, collection: &str) -> EcfResult<Vec<Value>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> EcfResult<bool> {
        Ok(self
            .collections
            .write()
            .await
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }
}
