use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::core::EcfResult;
use super::documents::DocumentStore;

/// `DocumentStore` sobre SQLite: una fila por documento, el JSON como texto.
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    pub async fn connect(url: &str) -> EcfResult<Self> {
        // Cada conexión a `:memory:` abre una base distinta.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> EcfResult<Self> {
        let store = SqlStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> EcfResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqlStore {
    async fn get(&self, collection: &str, id: &str) -> EcfResult<Option<Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> EcfResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(serde_json::to_string(&data)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, collection: &str) -> EcfResult<Vec<Value>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = ?1 ORDER BY id")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(data,)| serde_json::from_str(&data).map_err(Into::into))
            .collect()
    }

    async fn delete(&self, collection: &str, id: &str) -> EcfResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_and_read_back() {
        let store = SqlStore::connect("sqlite::memory:").await.unwrap();

        store.set("invoices", "A", json!({"id": "A", "status": "pendiente"})).await.unwrap();
        store.set("invoices", "A", json!({"id": "A", "status": "enviada"})).await.unwrap();
        store.set("invoices", "B", json!({"id": "B"})).await.unwrap();

        let doc = store.get("invoices", "A").await.unwrap().unwrap();
        assert_eq!(doc["status"], "enviada");
        assert_eq!(store.list("invoices").await.unwrap().len(), 2);
        assert!(store.get("clients", "A").await.unwrap().is_none());

        assert!(store.delete("invoices", "B").await.unwrap());
        assert_eq!(store.list("invoices").await.unwrap().len(), 1);
    }
}
