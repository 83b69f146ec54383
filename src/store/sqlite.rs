//! SQLite-backed document store
//!
//! All documents live in a single `documents` table keyed by full path, with
//! their fields serialized as JSON. Every write runs inside a transaction and
//! change notifications go out only after commit.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{
    merge_fields, ChangeFeed, CollectionPath, DocPath, Document, DocumentGateway, Fields,
    GatewayError, WriteOp,
};

/// Document store on an SQLite connection pool
pub struct SqliteGateway {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl std::fmt::Debug for SqliteGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteGateway")
            .field("listeners", &self.feed.listener_count())
            .finish()
    }
}

impl SqliteGateway {
    /// Open (or create) a document store
    /// If path is None, uses an in-memory database
    pub async fn open(path: Option<&str>) -> Result<Self, GatewayError> {
        let conn_str = match path {
            Some(p) => format!("sqlite:{}?mode=rwc", p),
            None => "sqlite::memory:".to_string(),
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // Each in-memory connection is its own database: keep exactly one, forever
        let pool_options = match path {
            Some(_) => SqlitePoolOptions::new().max_connections(5),
            None => SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        };

        let pool = pool_options.connect_with(options).await?;

        let store = Self {
            pool,
            feed: ChangeFeed::default(),
        };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), GatewayError> {
        info!("Running document store migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                fields TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, doc_id)",
        )
        .execute(&self.pool)
        .await?;

        info!("Document store migrations complete");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn load_fields(
        conn: &mut SqliteConnection,
        path: &DocPath,
    ) -> Result<Option<Fields>, GatewayError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT fields FROM documents WHERE path = ?")
            .bind(path.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store_fields(
        conn: &mut SqliteConnection,
        path: &DocPath,
        fields: &Fields,
    ) -> Result<(), GatewayError> {
        let json = serde_json::to_string(fields)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO documents (path, collection, doc_id, fields, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET fields = excluded.fields, updated_at = excluded.updated_at
            "#,
        )
        .bind(path.as_str())
        .bind(path.parent().as_str())
        .bind(path.id())
        .bind(&json)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Apply one write on an open transaction, returning whether anything changed
    async fn apply(conn: &mut SqliteConnection, op: WriteOp) -> Result<bool, GatewayError> {
        match op {
            WriteOp::Set { path, fields } => {
                Self::store_fields(conn, &path, &fields).await?;
                Ok(true)
            }
            WriteOp::Update { path, fields } => {
                let mut stored = Self::load_fields(conn, &path)
                    .await?
                    .ok_or_else(|| GatewayError::NotFound(path.clone()))?;
                merge_fields(&mut stored, fields);
                Self::store_fields(conn, &path, &stored).await?;
                Ok(true)
            }
            WriteOp::Delete { path } => {
                let result = sqlx::query("DELETE FROM documents WHERE path = ?")
                    .bind(path.as_str())
                    .execute(&mut *conn)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
        }
    }

    async fn write_one(&self, op: WriteOp) -> Result<bool, GatewayError> {
        let path = op.path().clone();

        let mut tx = self.pool.begin().await?;
        let changed = Self::apply(&mut *tx, op).await?;
        tx.commit().await?;

        if changed {
            self.feed.publish(path);
        }
        Ok(changed)
    }
}

fn parse_row(path: String, fields: String) -> Result<Document, GatewayError> {
    let path = DocPath::parse(&path)?;
    let fields: Fields = serde_json::from_str(&fields)?;
    Ok(Document::new(path, fields))
}

#[async_trait]
impl DocumentGateway for SqliteGateway {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, GatewayError> {
        let mut conn = self.pool.acquire().await?;
        let fields = Self::load_fields(&mut *conn, path).await?;
        Ok(fields.map(|f| Document::new(path.clone(), f)))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, GatewayError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT path, fields FROM documents WHERE collection = ? ORDER BY doc_id",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(path, fields)| parse_row(path, fields))
            .collect()
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), GatewayError> {
        self.write_one(WriteOp::Set {
            path: path.clone(),
            fields,
        })
        .await
        .map(|_| ())
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), GatewayError> {
        self.write_one(WriteOp::Update {
            path: path.clone(),
            fields,
        })
        .await
        .map(|_| ())
    }

    async fn delete(&self, path: &DocPath) -> Result<bool, GatewayError> {
        self.write_one(WriteOp::Delete { path: path.clone() }).await
    }

    async fn batch(&self, ops: Vec<WriteOp>) -> Result<(), GatewayError> {
        let touched: Vec<DocPath> = ops.iter().map(|op| op.path().clone()).collect();

        // Dropping the transaction on error rolls everything back
        let mut tx = self.pool.begin().await?;
        for op in ops {
            Self::apply(&mut *tx, op).await?;
        }
        tx.commit().await?;

        debug!("Committed batch of {} writes", touched.len());
        for path in touched {
            self.feed.publish(path);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<DocPath> {
        self.feed.receiver()
    }

    fn listener_count(&self) -> usize {
        self.feed.listener_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn doc(path: &str) -> DocPath {
        DocPath::parse(path).unwrap()
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = SqliteGateway::open(None).await.unwrap();
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_roundtrip_and_merge() {
        let store = SqliteGateway::open(None).await.unwrap();
        let path = doc("cartes/r1/characters/c1");

        store
            .set(&path, fields(json!({"Nomperso": "Aria", "PV": 10})))
            .await
            .unwrap();
        store.update(&path, fields(json!({"PV": 3}))).await.unwrap();

        let found = store.get(&path).await.unwrap().unwrap();
        assert_eq!(found.fields["PV"], json!(3));
        assert_eq!(found.fields["Nomperso"], json!("Aria"));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = SqliteGateway::open(None).await.unwrap();
        let result = store.update(&doc("users/ghost"), Fields::new()).await;
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_ordered_by_id() {
        let store = SqliteGateway::open(None).await.unwrap();
        for id in ["b", "c", "a"] {
            store
                .set(&doc(&format!("cartes/r1/characters/{}", id)), Fields::new())
                .await
                .unwrap();
        }
        store
            .set(&doc("cartes/r1/characters/a/notes/n1"), Fields::new())
            .await
            .unwrap();

        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();
        let ids: Vec<String> = store
            .list(&chars)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_batch_rolls_back() {
        let store = SqliteGateway::open(None).await.unwrap();
        let a = doc("cartes/r1/characters/a");
        store.set(&a, fields(json!({"currentInit": 2}))).await.unwrap();

        let result = store
            .batch(vec![
                WriteOp::Update {
                    path: a.clone(),
                    fields: fields(json!({"currentInit": 18})),
                },
                WriteOp::Update {
                    path: doc("cartes/r1/characters/missing"),
                    fields: Fields::new(),
                },
            ])
            .await;
        assert!(result.is_err());

        let stored = store.get(&a).await.unwrap().unwrap();
        assert_eq!(stored.fields["currentInit"], json!(2));
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("desk.db");
        let db_path = db_path.to_str().unwrap();
        let path = doc("users/u1");

        {
            let store = SqliteGateway::open(Some(db_path)).await.unwrap();
            store.set(&path, fields(json!({"room_id": "r1"}))).await.unwrap();
            store.pool().close().await;
        }

        let store = SqliteGateway::open(Some(db_path)).await.unwrap();
        let found = store.get(&path).await.unwrap().unwrap();
        assert_eq!(found.fields["room_id"], json!("r1"));
    }
}
