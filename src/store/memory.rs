//! In-memory document store
//!
//! Used by tests and by embedders that keep state in process.
//! Writes, and reads of one collection, can be made to fail on demand to
//! exercise the transient-failure paths of the sessions.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use super::{
    merge_fields, ChangeFeed, CollectionPath, DocPath, Document, DocumentGateway, Fields,
    GatewayError, WriteOp,
};

/// Document store held in a sorted map
#[derive(Debug, Default)]
pub struct MemoryGateway {
    docs: RwLock<BTreeMap<DocPath, Fields>>,
    feed: ChangeFeed,
    fail_writes: AtomicBool,
    fail_reads: RwLock<Option<CollectionPath>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make reads of one collection fail; `None` restores them
    pub fn fail_reads(&self, collection: Option<CollectionPath>) {
        *self.fail_reads.write() = collection;
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    fn check_writable(&self) -> Result<(), GatewayError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::WriteRejected(
                "store is not accepting writes".to_string(),
            ));
        }
        Ok(())
    }

    fn check_readable(&self, collection: &CollectionPath) -> Result<(), GatewayError> {
        if self.fail_reads.read().as_ref() == Some(collection) {
            return Err(GatewayError::ReadRejected(format!(
                "{} is not readable",
                collection
            )));
        }
        Ok(())
    }

    fn apply(docs: &mut BTreeMap<DocPath, Fields>, op: WriteOp) -> Result<bool, GatewayError> {
        match op {
            WriteOp::Set { path, fields } => {
                docs.insert(path, fields);
                Ok(true)
            }
            WriteOp::Update { path, fields } => match docs.get_mut(&path) {
                Some(stored) => {
                    merge_fields(stored, fields);
                    Ok(true)
                }
                None => Err(GatewayError::NotFound(path)),
            },
            WriteOp::Delete { path } => Ok(docs.remove(&path).is_some()),
        }
    }

    fn write_one(&self, op: WriteOp) -> Result<bool, GatewayError> {
        self.check_writable()?;
        let path = op.path().clone();
        let changed = {
            let mut docs = self.docs.write();
            Self::apply(&mut docs, op)?
        };
        if changed {
            self.feed.publish(path);
        }
        Ok(changed)
    }
}

#[async_trait]
impl DocumentGateway for MemoryGateway {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, GatewayError> {
        self.check_readable(&path.parent())?;
        let docs = self.docs.read();
        Ok(docs
            .get(path)
            .map(|fields| Document::new(path.clone(), fields.clone())))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, GatewayError> {
        self.check_readable(collection)?;
        let docs = self.docs.read();
        Ok(docs
            .iter()
            .filter(|(path, _)| collection.contains(path))
            .map(|(path, fields)| Document::new(path.clone(), fields.clone()))
            .collect())
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), GatewayError> {
        self.write_one(WriteOp::Set {
            path: path.clone(),
            fields,
        })
        .map(|_| ())
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), GatewayError> {
        self.write_one(WriteOp::Update {
            path: path.clone(),
            fields,
        })
        .map(|_| ())
    }

    async fn delete(&self, path: &DocPath) -> Result<bool, GatewayError> {
        self.write_one(WriteOp::Delete { path: path.clone() })
    }

    async fn batch(&self, ops: Vec<WriteOp>) -> Result<(), GatewayError> {
        self.check_writable()?;

        let touched: Vec<DocPath> = ops.iter().map(|op| op.path().clone()).collect();
        {
            let mut docs = self.docs.write();
            // Stage on a copy so a failing op leaves the store untouched
            let mut staged = docs.clone();
            for op in ops {
                Self::apply(&mut staged, op)?;
            }
            *docs = staged;
        }

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
