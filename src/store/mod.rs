//! Persistence gateway - hierarchical document store
//!
//! The dashboard and the character sheet never talk to a database directly.
//! They go through [`DocumentGateway`], which exposes document reads,
//! partial updates, atomic batches and a change feed that backs
//! [`Subscription`]s.

mod memory;
mod path;
mod sqlite;
mod subscription;

pub use memory::MemoryGateway;
pub use path::{CollectionPath, DocPath, PathError, MAX_PATH_LEN};
pub use sqlite::SqliteGateway;
pub use subscription::{subscribe, ChangeFeed, Subscription};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Document fields are stored as a JSON object
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A document read from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub fields: Fields,
}

impl Document {
    pub fn new(path: DocPath, fields: Fields) -> Self {
        Self { path, fields }
    }

    /// Document id (final path segment)
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite a document
    Set { path: DocPath, fields: Fields },
    /// Merge fields into an existing document
    Update { path: DocPath, fields: Fields },
    /// Remove a document (missing documents are ignored)
    Delete { path: DocPath },
}

impl WriteOp {
    /// Path touched by this write
    pub fn path(&self) -> &DocPath {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Update { path, .. } | WriteOp::Delete { path } => {
                path
            }
        }
    }
}

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("document not found: {0}")]
    NotFound(DocPath),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("write rejected: {0}")]
    WriteRejected(String),

    #[error("read rejected: {0}")]
    ReadRejected(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Access to the remote document store
#[async_trait]
pub trait DocumentGateway: Send + Sync {
    /// Read one document
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, GatewayError>;

    /// Read every document of a collection, ordered by id
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, GatewayError>;

    /// Create or overwrite a document
    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), GatewayError>;

    /// Merge fields into an existing document
    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), GatewayError>;

    /// Delete a document, returning whether it existed
    async fn delete(&self, path: &DocPath) -> Result<bool, GatewayError>;

    /// Apply all writes or none of them
    async fn batch(&self, ops: Vec<WriteOp>) -> Result<(), GatewayError>;

    /// Create a document with a generated id
    async fn add(&self, collection: &CollectionPath, fields: Fields) -> Result<DocPath, GatewayError> {
        let path = collection.doc(&new_document_id())?;
        self.set(&path, fields).await?;
        Ok(path)
    }

    /// Receiver of changed document paths
    fn changes(&self) -> broadcast::Receiver<DocPath>;

    /// Number of live change-feed receivers
    fn listener_count(&self) -> usize;
}

/// Generate a random document id
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Shallow merge used by `update`: incoming keys replace stored ones
pub(crate) fn merge_fields(target: &mut Fields, incoming: Fields) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_fields() {
        let mut stored = json!({"PV": 10, "Nomperso": "Aria"})
            .as_object()
            .cloned()
            .unwrap();
        let incoming = json!({"PV": 4, "PV_Max": 12}).as_object().cloned().unwrap();

        merge_fields(&mut stored, incoming);
        assert_eq!(stored["PV"], json!(4));
        assert_eq!(stored["PV_Max"], json!(12));
        assert_eq!(stored["Nomperso"], json!("Aria"));
    }

    #[test]
    fn test_generated_ids_are_valid_segments() {
        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();
        let id = new_document_id();
        assert_eq!(id.len(), 32);
        assert!(chars.doc(&id).is_ok());
        assert_ne!(id, new_document_id());
    }

    #[test]
    fn test_write_op_path() {
        let path = DocPath::parse("users/u1").unwrap();
        let op = WriteOp::Delete { path: path.clone() };
        assert_eq!(op.path(), &path);
    }
}
