//! In-process record store backing every cell.
//!
//! A [`Collection`] is a named map of records guarded by a single async
//! `RwLock`, with a broadcast feed that publishes the full snapshot of every
//! record a committed write touched. The important calls for the domain
//! layer are:
//!
//! - [`Collection::insert_unless`] - the atomic conditional write: the
//!   conflict predicate runs under the same write lock as the insert, so two
//!   racing writers can never both pass the check.
//! - [`Collection::try_update`] - serialized read-modify-write: the closure
//!   sees the current record under the write lock and may veto the update
//!   with a domain error, in which case the record is left untouched.
//! - [`Collection::watch`] - live subscription. Dropping the returned
//!   [`Feed`] unregisters the listener; a lagged feed resynchronizes from
//!   the collection instead of failing, which is safe because every event
//!   is a full snapshot.
//!
//! The contract is deliberately small so the whole thing can be re-backed
//! by a durable engine without touching the cells.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

/// A record that can live in a [`Collection`].
pub trait Document: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found in {collection}: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("duplicate id in {collection}: {id}")]
    Duplicate { collection: &'static str, id: String },

    #[error("conditional write rejected in {collection}")]
    Conflict { collection: &'static str },
}

const DEFAULT_FEED_CAPACITY: usize = 256;

pub struct Collection<T: Document> {
    name: &'static str,
    records: Arc<RwLock<HashMap<T::Id, T>>>,
    feed: broadcast::Sender<T>,
}

impl<T: Document> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            records: Arc::clone(&self.records),
            feed: self.feed.clone(),
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(name: &'static str) -> Self {
        Self::with_feed_capacity(name, DEFAULT_FEED_CAPACITY)
    }

    /// Mostly useful in tests that want to provoke feed lag.
    pub fn with_feed_capacity(name: &'static str, capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(capacity);
        Self {
            name,
            records: Arc::new(RwLock::new(HashMap::new())),
            feed,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn get(&self, id: &T::Id) -> Option<T> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<T> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn find<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.records
            .read()
            .await
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Inserts a new record. Fails with [`StoreError::Duplicate`] if the id
    /// is already present.
    pub async fn insert(&self, record: T) -> Result<T, StoreError> {
        let mut records = self.records.write().await;
        let id = record.id();
        if records.contains_key(&id) {
            return Err(StoreError::Duplicate {
                collection: self.name,
                id: id.to_string(),
            });
        }
        records.insert(id, record.clone());
        self.publish(&record);
        Ok(record)
    }

    /// Atomic conditional insert: the conflict predicate is evaluated
    /// against every existing record under the write lock, so concurrent
    /// callers serialize and at most one of them can win a contested spot.
    pub async fn insert_unless<F>(&self, record: T, conflict: F) -> Result<T, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        let mut records = self.records.write().await;
        let id = record.id();
        if records.contains_key(&id) {
            return Err(StoreError::Duplicate {
                collection: self.name,
                id: id.to_string(),
            });
        }
        if records.values().any(|existing| conflict(existing)) {
            debug!("Conditional insert into {} rejected", self.name);
            return Err(StoreError::Conflict { collection: self.name });
        }
        records.insert(id, record.clone());
        self.publish(&record);
        Ok(record)
    }

    /// Serialized read-modify-write. The closure runs against a copy of the
    /// current record under the write lock; if it returns an error the
    /// stored record is left exactly as it was.
    pub async fn try_update<F, E>(&self, id: &T::Id, apply: F) -> Result<T, E>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut records = self.records.write().await;
        let current = records.get_mut(id).ok_or_else(|| {
            E::from(StoreError::NotFound {
                collection: self.name,
                id: id.to_string(),
            })
        })?;
        let mut candidate = current.clone();
        apply(&mut candidate)?;
        *current = candidate.clone();
        self.publish(&candidate);
        Ok(candidate)
    }

    /// Infallible variant of [`Collection::try_update`].
    pub async fn update<F>(&self, id: &T::Id, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut T),
    {
        self.try_update(id, |record| {
            apply(record);
            Ok::<(), StoreError>(())
        })
        .await
    }

    pub async fn remove(&self, id: &T::Id) -> Result<T, StoreError> {
        self.records.write().await.remove(id).ok_or_else(|| StoreError::NotFound {
            collection: self.name,
            id: id.to_string(),
        })
    }

    /// Subscribes to the live feed of committed snapshots.
    pub fn watch(&self) -> Feed<T> {
        Feed {
            collection: self.clone(),
            rx: self.feed.subscribe(),
        }
    }

    fn publish(&self, record: &T) {
        // No subscribers is the normal case for collections nobody watches.
        let _ = self.feed.send(record.clone());
    }
}

/// One event from a [`Feed`].
#[derive(Debug, Clone)]
pub enum FeedEvent<T> {
    /// A single committed record snapshot.
    Changed(T),
    /// The feed fell behind and events were skipped; the full current
    /// contents are delivered so the consumer can rebuild its view.
    Resync(Vec<T>),
}

/// Live subscription handle. Dropping it unregisters the listener.
pub struct Feed<T: Document> {
    collection: Collection<T>,
    rx: broadcast::Receiver<T>,
}

impl<T: Document> Feed<T> {
    /// Next committed change, or `None` once the collection is gone.
    pub async fn next(&mut self) -> Option<FeedEvent<T>> {
        match self.rx.recv().await {
            Ok(record) => Some(FeedEvent::Changed(record)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(
                    "Feed on {} lagged by {} events, resyncing from collection",
                    self.collection.name, skipped
                );
                Some(FeedEvent::Resync(self.collection.list().await))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}
