//! # Document store
//!
//! An in-process stand-in for the remote document database. One task owns every
//! document; callers reach it only through [`StoreClient`], which sends typed
//! requests over an mpsc channel and awaits the reply on a oneshot channel.
//!
//! Every document slot carries a version stamped from a global commit sequence.
//! [`StoreClient::run_transaction`] snapshots the versions of the keys it
//! declares, lets the caller compute writes, and commits only if none of those
//! versions moved in the meantime. A lost race is retried with backoff.

use std::collections::HashMap;
use std::fmt::{self, Display};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::retry::{retry_on_transient, IsTransient, RetryConfig, RetryResult};

// =============================================================================
// 1. DOCUMENTS AND KEYS
// =============================================================================

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Address of a document: the collection path plus the document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocKey {
    pub collection: String,
    pub id: String,
}

impl DocKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Concurrent modification of {key}")]
    Conflict { key: DocKey },
    #[error("Transaction gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("Transaction read undeclared key {key}")]
    UndeclaredRead { key: DocKey },
    #[error("Invalid document {key}: {reason}")]
    InvalidDocument { key: DocKey, reason: String },
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Serializes a value into a document. Anything that is not a JSON object is rejected.
pub fn to_document<T: Serialize>(key: &DocKey, value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(StoreError::InvalidDocument {
            key: key.clone(),
            reason: format!("expected an object, got {}", other),
        }),
        Err(e) => Err(StoreError::InvalidDocument {
            key: key.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Deserializes a document, reporting the key on failure.
pub fn from_document<T: DeserializeOwned>(key: &DocKey, document: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(document)).map_err(|e| StoreError::InvalidDocument {
        key: key.clone(),
        reason: e.to_string(),
    })
}

// =============================================================================
// 2. MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// A buffered transaction write.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Set { key: DocKey, document: Document },
    Delete { key: DocKey },
}

/// One key of a transaction snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadEntry {
    pub key: DocKey,
    /// 0 for a key that was never written
    pub version: u64,
    pub document: Option<Document>,
}

#[derive(Debug)]
pub enum StoreRequest {
    Get {
        key: DocKey,
        respond_to: Response<Option<Document>>,
    },
    Snapshot {
        keys: Vec<DocKey>,
        respond_to: Response<Vec<ReadEntry>>,
    },
    Commit {
        reads: Vec<(DocKey, u64)>,
        writes: Vec<Write>,
        respond_to: Response<u64>,
    },
    Put {
        key: DocKey,
        document: Document,
        respond_to: Response<()>,
    },
    BatchPut {
        entries: Vec<(DocKey, Document)>,
        respond_to: Response<()>,
    },
    Delete {
        key: DocKey,
        respond_to: Response<()>,
    },
    BatchDelete {
        keys: Vec<DocKey>,
        respond_to: Response<()>,
    },
    List {
        collection: String,
        respond_to: Response<Vec<(String, Document)>>,
    },
}

// =============================================================================
// 3. THE STORE TASK
// =============================================================================

#[derive(Debug, Default)]
struct Slot {
    version: u64,
    /// `None` is a tombstone: the key was deleted but keeps its version.
    document: Option<Document>,
}

pub struct DocumentStore {
    receiver: mpsc::Receiver<StoreRequest>,
    slots: HashMap<DocKey, Slot>,
    commit_seq: u64,
}

impl DocumentStore {
    pub fn new(buffer_size: usize, retry: RetryConfig) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            slots: HashMap::new(),
            commit_seq: 0,
        };
        let client = StoreClient::new(sender, retry);
        (store, client)
    }

    /// Serves requests until every client has been dropped.
    #[instrument(name = "document_store", skip(self))]
    pub async fn run(mut self) {
        info!("DocumentStore starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Get { key, respond_to } => {
                    let document = self.slots.get(&key).and_then(|slot| slot.document.clone());
                    let _ = respond_to.send(Ok(document));
                }
                StoreRequest::Snapshot { keys, respond_to } => {
                    let entries = keys.into_iter().map(|key| self.read(key)).collect();
                    let _ = respond_to.send(Ok(entries));
                }
                StoreRequest::Commit { reads, writes, respond_to } => {
                    let _ = respond_to.send(self.commit(reads, writes));
                }
                StoreRequest::Put { key, document, respond_to } => {
                    self.apply(Write::Set { key, document });
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::BatchPut { entries, respond_to } => {
                    for (key, document) in entries {
                        self.apply(Write::Set { key, document });
                    }
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Delete { key, respond_to } => {
                    self.apply(Write::Delete { key });
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::BatchDelete { keys, respond_to } => {
                    for key in keys {
                        self.apply(Write::Delete { key });
                    }
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::List { collection, respond_to } => {
                    let _ = respond_to.send(Ok(self.list(&collection)));
                }
            }
        }
        info!(commit_seq = self.commit_seq, "DocumentStore stopped");
    }

    fn read(&self, key: DocKey) -> ReadEntry {
        match self.slots.get(&key) {
            Some(slot) => ReadEntry {
                version: slot.version,
                document: slot.document.clone(),
                key,
            },
            None => ReadEntry {
                key,
                version: 0,
                document: None,
            },
        }
    }

    fn version_of(&self, key: &DocKey) -> u64 {
        self.slots.get(key).map_or(0, |slot| slot.version)
    }

    fn commit(&mut self, reads: Vec<(DocKey, u64)>, writes: Vec<Write>) -> Result<u64, StoreError> {
        if let Some((key, _)) = reads.into_iter().find(|(key, seen)| self.version_of(key) != *seen) {
            debug!(key = %key, "Commit rejected");
            return Err(StoreError::Conflict { key });
        }
        for write in writes {
            self.apply(write);
        }
        Ok(self.commit_seq)
    }

    fn apply(&mut self, write: Write) {
        match write {
            Write::Set { key, document } => {
                self.commit_seq += 1;
                let slot = self.slots.entry(key).or_default();
                slot.version = self.commit_seq;
                slot.document = Some(document);
            }
            Write::Delete { key } => {
                // Deleting a missing document changes nothing, so it keeps its version.
                if let Some(slot) = self.slots.get_mut(&key) {
                    if slot.document.is_some() {
                        self.commit_seq += 1;
                        slot.version = self.commit_seq;
                        slot.document = None;
                    }
                }
            }
        }
    }

    fn list(&self, collection: &str) -> Vec<(String, Document)> {
        let mut documents: Vec<(String, Document)> = self
            .slots
            .iter()
            .filter(|(key, _)| key.collection == collection)
            .filter_map(|(key, slot)| slot.document.clone().map(|doc| (key.id.clone(), doc)))
            .collect();
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        documents
    }
}

// =============================================================================
// 4. TRANSACTIONS
// =============================================================================

/// Snapshot of the declared keys plus the writes buffered against it.
#[derive(Debug)]
pub struct Transaction {
    reads: HashMap<DocKey, ReadEntry>,
    writes: Vec<Write>,
}

impl Transaction {
    fn new(entries: Vec<ReadEntry>) -> Self {
        let reads = entries.into_iter().map(|e| (e.key.clone(), e)).collect();
        Self {
            reads,
            writes: Vec::new(),
        }
    }

    /// Reads a declared key as of the snapshot.
    pub fn get(&self, key: &DocKey) -> Result<Option<&Document>, StoreError> {
        self.reads
            .get(key)
            .map(|entry| entry.document.as_ref())
            .ok_or_else(|| StoreError::UndeclaredRead { key: key.clone() })
    }

    pub fn set(&mut self, key: DocKey, document: Document) {
        self.writes.push(Write::Set { key, document });
    }

    pub fn delete(&mut self, key: DocKey) {
        self.writes.push(Write::Delete { key });
    }

    fn into_parts(self) -> (Vec<(DocKey, u64)>, Vec<Write>) {
        let reads = self.reads.into_values().map(|e| (e.key, e.version)).collect();
        (reads, self.writes)
    }
}

/// Why one transaction attempt did not commit.
#[derive(Debug)]
enum TxnError<E> {
    /// The body rejected the snapshot; never retried.
    Aborted(E),
    Store(StoreError),
}

impl<E: Display> Display for TxnError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnError::Aborted(e) => write!(f, "aborted: {}", e),
            TxnError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl<E> IsTransient for TxnError<E> {
    fn is_transient(&self) -> bool {
        match self {
            TxnError::Aborted(_) => false,
            TxnError::Store(e) => e.is_transient(),
        }
    }
}

// =============================================================================
// 5. THE CLIENT
// =============================================================================

#[derive(Clone, Debug)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
    retry: RetryConfig,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>, retry: RetryConfig) -> Self {
        Self { sender, retry }
    }

    async fn request<T>(&self, make: impl FnOnce(Response<T>) -> StoreRequest) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(make(respond_to))
            .await
            .map_err(|_| StoreError::Unavailable("Store closed".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::Unavailable("Store dropped request".to_string()))?
    }

    pub async fn get(&self, key: DocKey) -> Result<Option<Document>, StoreError> {
        self.request(|respond_to| StoreRequest::Get { key, respond_to }).await
    }

    pub async fn put(&self, key: DocKey, document: Document) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::Put { key, document, respond_to }).await
    }

    /// Writes every entry or none of them.
    pub async fn batch_put(&self, entries: Vec<(DocKey, Document)>) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::BatchPut { entries, respond_to }).await
    }

    /// Deleting a missing document succeeds.
    pub async fn delete(&self, key: DocKey) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::Delete { key, respond_to }).await
    }

    /// Deletes every key or none of them.
    pub async fn batch_delete(&self, keys: Vec<DocKey>) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::BatchDelete { keys, respond_to }).await
    }

    /// Live documents of one collection, ordered by id.
    pub async fn list(&self, collection: impl Into<String>) -> Result<Vec<(String, Document)>, StoreError> {
        let collection = collection.into();
        self.request(|respond_to| StoreRequest::List { collection, respond_to }).await
    }

    async fn snapshot(&self, keys: Vec<DocKey>) -> Result<Vec<ReadEntry>, StoreError> {
        self.request(|respond_to| StoreRequest::Snapshot { keys, respond_to }).await
    }

    async fn commit(&self, reads: Vec<(DocKey, u64)>, writes: Vec<Write>) -> Result<u64, StoreError> {
        self.request(|respond_to| StoreRequest::Commit { reads, writes, respond_to }).await
    }

    /// Runs `body` as an optimistic transaction over `keys`.
    ///
    /// `body` may run several times and must only depend on what it reads
    /// through the [`Transaction`]. An error from `body` aborts without
    /// retrying. A commit that loses against a concurrent write is retried
    /// until the attempts configured for this client run out, which surfaces
    /// as [`StoreError::RetriesExhausted`].
    pub async fn run_transaction<T, E, F>(&self, keys: Vec<DocKey>, body: F) -> Result<T, E>
    where
        F: Fn(&mut Transaction) -> Result<T, E> + Sync,
        E: From<StoreError> + Display,
    {
        let client = self;
        let body = &body;
        let keys = &keys;

        let outcome = retry_on_transient(&self.retry, move |attempt| async move {
            let entries = client.snapshot(keys.clone()).await.map_err(TxnError::Store)?;
            let mut tx = Transaction::new(entries);
            let value = body(&mut tx).map_err(TxnError::Aborted)?;
            let (reads, writes) = tx.into_parts();
            let seq = client.commit(reads, writes).await.map_err(TxnError::Store)?;
            debug!(attempt, commit_seq = seq, "Transaction committed");
            Ok::<T, TxnError<E>>(value)
        })
        .await;

        match outcome {
            RetryResult::Success(value) => Ok(value),
            RetryResult::PermanentFailure(TxnError::Aborted(e)) => Err(e),
            RetryResult::PermanentFailure(TxnError::Store(e)) => Err(E::from(e)),
            RetryResult::Exhausted { attempts, error } => {
                warn!(attempts, error = %error, "Transaction abandoned");
                Err(E::from(StoreError::RetriesExhausted { attempts }))
            }
        }
    }
}
