pub mod documents;
pub mod repository;
pub mod s3;
pub mod sqlite;

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::core::{EcfError, EcfResult};

pub use documents::{DocumentStore, MemoryStore};
pub use repository::Repository;
pub use s3::S3Storage;
pub use sqlite::SqlStore;

/// Almacenamiento de archivos generados (PDF y XML).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Guarda el objeto y devuelve la URL con la que se puede descargar.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> EcfResult<String>;

    async fn get(&self, key: &str) -> EcfResult<Vec<u8>>;

    /// Elimina el objeto; no falla si no existe.
    async fn delete(&self, key: &str) -> EcfResult<()>;
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Almacenamiento en memoria, para desarrollo y pruebas.
pub struct MemoryStorage {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        MemoryStorage {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("memory://facturacion")
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> EcfResult<String> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", self.base_url, key))
    }

    async fn get(&self, key: &str) -> EcfResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| EcfError::not_found(format!("El archivo {} no existe", key)))
    }

    async fn delete(&self, key: &str) -> EcfResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
