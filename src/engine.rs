//! Synchronization engine
//!
//! Every edit is a whole-document read-modify-write: fetch the document,
//! normalize the target slice, apply the caller's change, validate it and
//! replace the document. Edits against one engine are serialized through a
//! single mutex, and each runs on its own task so that a caller going away
//! never abandons a write halfway.

use serde_json::Value;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{
    normalize, ConfigDocument, General, RomajiTable, Shortcuts, Slice, SliceName, SymbolWidth,
    UserDictionary, ValidationFailure, WidthGroups, Zenzai,
};
use crate::store::{DocumentStore, StoreError};

/// Where the engine is in the current edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPhase {
    #[default]
    Idle,
    Fetching,
    Validating,
    Persisting,
    /// Validation failed, nothing was written
    Rejected,
    /// The store could not be read or written
    Failed,
}

/// Why an edit did not go through
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("edit rejected: {}", describe(.0))]
    Rejected(Vec<ValidationFailure>),

    #[error("update failed: {0}")]
    Transport(#[from] StoreError),
}

impl EditError {
    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            EditError::Rejected(failures) => failures,
            EditError::Transport(_) => &[],
        }
    }
}

fn describe(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

struct Shared<S> {
    store: S,
    /// Held for the whole of every read-modify-write
    edit_lock: Arc<Mutex<()>>,
    phase: watch::Sender<EditPhase>,
    /// Last document read from or written to the store
    snapshot: StdMutex<Option<ConfigDocument>>,
}

impl<S> Shared<S> {
    fn set_phase(&self, phase: EditPhase) {
        debug!(phase = ?phase, "edit phase");
        self.phase.send_replace(phase);
    }

    /// Report a terminal phase, then settle back to idle
    fn finish(&self, phase: EditPhase) {
        self.set_phase(phase);
        self.set_phase(EditPhase::Idle);
    }

    fn store_snapshot(&self, document: Option<ConfigDocument>) {
        match self.snapshot.lock() {
            Ok(mut snapshot) => *snapshot = document,
            Err(poisoned) => *poisoned.into_inner() = document,
        }
    }

    fn snapshot(&self) -> Option<ConfigDocument> {
        match self.snapshot.lock() {
            Ok(snapshot) => snapshot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<S: DocumentStore> Shared<S> {
    /// Fetch the document, marking the engine failed if the store errors
    async fn fetch(&self) -> Result<ConfigDocument, EditError> {
        self.set_phase(EditPhase::Fetching);
        match self.store.get_document().await {
            Ok(document) => Ok(document),
            Err(e) => {
                error!(error = %e, "failed to fetch settings document");
                self.store_snapshot(None);
                self.finish(EditPhase::Failed);
                Err(e.into())
            }
        }
    }

    async fn run_edit<T, F>(&self, apply: F) -> Result<T::Value, EditError>
    where
        T: Slice,
        F: FnOnce(T::Value) -> Result<T::Value, Vec<ValidationFailure>>,
    {
        let slice = T::NAME;
        self.store_snapshot(None);

        let mut document = self.fetch().await?;
        let current = T::read(&document);

        self.set_phase(EditPhase::Validating);
        let value = match apply(current).and_then(T::prepare) {
            Ok(value) => value,
            Err(failures) => {
                warn!(slice = %slice, failures = failures.len(), "edit rejected");
                for failure in &failures {
                    debug!(slice = %slice, %failure, "validation failure");
                }
                self.finish(EditPhase::Rejected);
                return Err(EditError::Rejected(failures));
            }
        };

        self.set_phase(EditPhase::Persisting);
        if let Err(e) = T::write(&mut document, &value) {
            error!(slice = %slice, error = %e, "failed to encode slice");
            self.finish(EditPhase::Failed);
            return Err(StoreError::Encode(e).into());
        }

        if let Err(e) = self.store.replace_document(document.clone()).await {
            error!(slice = %slice, error = %e, "failed to persist settings document");
            self.finish(EditPhase::Failed);
            return Err(e.into());
        }

        info!(slice = %slice, "settings slice saved");
        self.store_snapshot(Some(document));
        self.set_phase(EditPhase::Idle);
        Ok(value)
    }

    async fn refresh(&self) -> Result<ConfigDocument, EditError> {
        let document = self.fetch().await?;
        self.store_snapshot(Some(document.clone()));
        self.set_phase(EditPhase::Idle);
        Ok(document)
    }
}

/// Serializes slice edits against one settings document
///
/// Cloning is cheap; clones share the store, the edit queue and the snapshot.
pub struct SyncEngine<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for SyncEngine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: DocumentStore> SyncEngine<S> {
    pub fn new(store: S) -> Self {
        let (phase, _) = watch::channel(EditPhase::Idle);
        Self {
            shared: Arc::new(Shared {
                store,
                edit_lock: Arc::new(Mutex::new(())),
                phase,
                snapshot: StdMutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// Current phase of the edit in flight, `Idle` when there is none
    pub fn phase(&self) -> EditPhase {
        *self.shared.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EditPhase> {
        self.shared.phase.subscribe()
    }

    /// Last document seen by the engine
    ///
    /// Cleared when an edit starts and whenever the store fails, so a `Some`
    /// is always a document the store actually returned or accepted.
    pub fn snapshot(&self) -> Option<ConfigDocument> {
        self.shared.snapshot()
    }

    /// Apply `delta` to the canonical value of slice `T` and persist it
    ///
    /// Returns the value as persisted, which can differ from what `delta`
    /// produced once trimming and migration are applied.
    pub async fn edit<T, F>(&self, delta: F) -> Result<T::Value, EditError>
    where
        T: Slice,
        F: FnOnce(&mut T::Value) + Send + 'static,
    {
        self.dispatch::<T, _>(move |mut value| {
            delta(&mut value);
            Ok(value)
        })
        .await
    }

    /// Like [`edit`](Self::edit), but `delta` can reject the edit against the
    /// value it actually sees
    pub async fn try_edit<T, F>(&self, delta: F) -> Result<T::Value, EditError>
    where
        T: Slice,
        F: FnOnce(&mut T::Value) -> Result<(), Vec<ValidationFailure>> + Send + 'static,
    {
        self.dispatch::<T, _>(move |mut value| {
            delta(&mut value)?;
            Ok(value)
        })
        .await
    }

    /// Replace slice `T` wholesale
    pub async fn replace<T: Slice>(&self, value: T::Value) -> Result<T::Value, EditError> {
        self.dispatch::<T, _>(move |_| Ok(value)).await
    }

    /// Apply caller-supplied JSON to a slice picked at runtime
    ///
    /// Objects patch map slices; arrays replace sequence slices. The return is
    /// the persisted canonical value as JSON.
    pub async fn edit_raw(&self, slice: SliceName, raw: Value) -> Result<Value, EditError> {
        match slice {
            SliceName::Shortcuts => self.edit_raw_as::<Shortcuts>(raw).await,
            SliceName::General => self.edit_raw_as::<General>(raw).await,
            SliceName::Zenzai => self.edit_raw_as::<Zenzai>(raw).await,
            SliceName::SymbolWidth => self.edit_raw_as::<SymbolWidth>(raw).await,
            SliceName::WidthGroups => self.edit_raw_as::<WidthGroups>(raw).await,
            SliceName::RomajiTable => self.edit_raw_as::<RomajiTable>(raw).await,
            SliceName::UserDictionary => self.edit_raw_as::<UserDictionary>(raw).await,
        }
    }

    async fn edit_raw_as<T: Slice>(&self, raw: Value) -> Result<Value, EditError> {
        let value = self
            .dispatch::<T, _>(move |current| T::apply_raw(current, &raw))
            .await?;
        serde_json::to_value(&value).map_err(|e| StoreError::Encode(e).into())
    }

    /// Canonical value of slice `T` as currently stored
    pub async fn read<T: Slice>(&self) -> Result<T::Value, EditError> {
        let document = self.refresh().await?;
        Ok(T::read(&document))
    }

    /// Canonical value of a slice picked at runtime, as JSON
    pub async fn read_raw(&self, slice: SliceName) -> Result<Value, EditError> {
        let document = self.refresh().await?;
        Ok(normalize(slice, document.slice(slice)))
    }

    /// Fetch the whole document and remember it as the snapshot
    ///
    /// Queues behind any edit in flight, so it observes that edit's write.
    pub async fn refresh(&self) -> Result<ConfigDocument, EditError> {
        let shared = Arc::clone(&self.shared);
        let lock = Arc::clone(&shared.edit_lock);
        let task = tokio::spawn(async move {
            let _guard = lock.lock_owned().await;
            shared.refresh().await
        });
        join(task, "refresh").await
    }

    async fn dispatch<T, F>(&self, apply: F) -> Result<T::Value, EditError>
    where
        T: Slice,
        F: FnOnce(T::Value) -> Result<T::Value, Vec<ValidationFailure>> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let lock = Arc::clone(&shared.edit_lock);
        let task = tokio::spawn(async move {
            let _guard = lock.lock_owned().await;
            shared.run_edit::<T, F>(apply).await
        });

        join(task, T::NAME.as_str()).await
    }
}

async fn join<V>(task: JoinHandle<Result<V, EditError>>, what: &str) -> Result<V, EditError> {
    match task.await {
        Ok(result) => result,
        Err(e) => {
            error!(task = what, error = %e, "engine task did not complete");
            Err(StoreError::Unavailable(format!("{what} task did not complete: {e}")).into())
        }
    }
}
