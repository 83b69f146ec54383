//! Collection subscriptions
//!
//! A [`Subscription`] is an explicit handle owned by a session. It yields the
//! current collection snapshot first, then a fresh snapshot whenever a
//! document directly inside the collection changes. Closing (or dropping) the
//! handle detaches it from the gateway's change feed.

use std::sync::Arc;

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, warn};

use super::{CollectionPath, DocPath, Document, DocumentGateway, GatewayError};

/// Default capacity of a change feed
pub const FEED_CAPACITY: usize = 256;

/// Broadcast of changed document paths, shared by gateway implementations
#[derive(Debug)]
pub struct ChangeFeed {
    tx: broadcast::Sender<DocPath>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Announce a changed document (no-op without listeners)
    pub fn publish(&self, path: DocPath) {
        let _ = self.tx.send(path);
    }

    pub fn receiver(&self) -> broadcast::Receiver<DocPath> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Live view of one collection
pub struct Subscription {
    gateway: Arc<dyn DocumentGateway>,
    collection: CollectionPath,
    rx: Option<broadcast::Receiver<DocPath>>,
    primed: bool,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("open", &self.rx.is_some())
            .finish()
    }
}

/// Subscribe to a collection
///
/// The change receiver is attached before the first read so no write between
/// the snapshot and the first notification is lost.
pub fn subscribe(gateway: Arc<dyn DocumentGateway>, collection: CollectionPath) -> Subscription {
    let rx = gateway.changes();
    debug!("Subscribed to {}", collection);
    Subscription {
        gateway,
        collection,
        rx: Some(rx),
        primed: false,
    }
}

impl Subscription {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn is_open(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the next snapshot
    ///
    /// Returns `None` once the subscription is closed or the gateway is gone.
    /// Bursts of changes (a batch, say) are coalesced into one snapshot.
    pub async fn next_snapshot(&mut self) -> Option<Result<Vec<Document>, GatewayError>> {
        let rx = self.rx.as_mut()?;

        if self.primed {
            loop {
                match rx.recv().await {
                    Ok(path) if self.collection.contains(&path) => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            "Subscription to {} lagged by {} changes, resyncing",
                            self.collection, skipped
                        );
                        break;
                    }
                    Err(RecvError::Closed) => {
                        self.rx = None;
                        return None;
                    }
                }
            }

            loop {
                match rx.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }

            // Owed a snapshot until the read below completes
            self.primed = false;
        }

        let snapshot = self.gateway.list(&self.collection).await;
        self.primed = true;
        Some(snapshot)
    }

    /// Detach from the change feed
    pub fn close(&mut self) {
        if self.rx.take().is_some() {
            debug!("Unsubscribed from {}", self.collection);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryGateway;
    use serde_json::json;
    use std::time::Duration;

    fn fields(value: serde_json::Value) -> crate::store::Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_first_snapshot_is_immediate() {
        let gateway = Arc::new(MemoryGateway::new());
        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();
        gateway
            .set(&chars.doc("a").unwrap(), fields(json!({"PV": 3})))
            .await
            .unwrap();

        let mut sub = subscribe(gateway.clone(), chars);
        let docs = sub.next_snapshot().await.unwrap().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id(), "a");
    }

    #[tokio::test]
    async fn test_change_in_collection_wakes_subscriber() {
        let gateway = Arc::new(MemoryGateway::new());
        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();
        let mut sub = subscribe(gateway.clone(), chars.clone());
        sub.next_snapshot().await.unwrap().unwrap();

        gateway
            .set(&chars.doc("b").unwrap(), fields(json!({"PV": 7})))
            .await
            .unwrap();

        let docs = tokio::time::timeout(Duration::from_secs(1), sub.next_snapshot())
            .await
            .expect("snapshot timed out")
            .unwrap()
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields["PV"], json!(7));
    }

    #[tokio::test]
    async fn test_changes_elsewhere_are_ignored() {
        let gateway = Arc::new(MemoryGateway::new());
        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();
        let mut sub = subscribe(gateway.clone(), chars);
        sub.next_snapshot().await.unwrap().unwrap();

        gateway
            .set(&DocPath::parse("users/u1").unwrap(), fields(json!({})))
            .await
            .unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(50), sub.next_snapshot()).await;
        assert!(waited.is_err(), "unrelated write should not produce a snapshot");
    }

    #[tokio::test]
    async fn test_close_detaches_listener() {
        let gateway = Arc::new(MemoryGateway::new());
        let chars = CollectionPath::parse("cartes/r1/characters").unwrap();

        let mut sub = subscribe(gateway.clone(), chars);
        assert_eq!(gateway.listener_count(), 1);
        assert!(sub.is_open());

        sub.close();
        assert!(!sub.is_open());
        assert_eq!(gateway.listener_count(), 0);
        assert!(sub.next_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_detaches_listener() {
        let gateway = Arc::new(MemoryGateway::new());
        {
            let _sub = subscribe(gateway.clone(), CollectionPath::parse("users").unwrap());
            assert_eq!(gateway.listener_count(), 1);
        }
        assert_eq!(gateway.listener_count(), 0);
    }
}
