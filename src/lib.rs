#![forbid(unsafe_code)]

//! Settings synchronization for a Japanese input method
//!
//! One JSON document holds every setting. Surfaces edit one slice at a time
//! through [`SyncEngine`], which normalizes, validates and persists the whole
//! document on each edit.

pub mod capability;
pub mod config;
pub mod constants;
pub mod engine;
pub mod ipc;
pub mod store;

pub use engine::{EditError, EditPhase, SyncEngine};
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError};
