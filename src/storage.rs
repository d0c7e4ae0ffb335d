//! Persistence collaborators.
//!
//! The engine only ever sees a raw JSON document on load and a [`State`] on
//! save. Where the document lives is up to the [`Store`] implementation.

use std::path::PathBuf;

use serde_json::Value;

use crate::domain::State;

mod file;
mod memory;
mod replicated;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use replicated::Replicated;

/// Errors that can occur when persisting state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The state could not be encoded.
    #[error("failed to encode state: {0}")]
    Json(#[from] serde_json::Error),
    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A durable home for the state document.
pub trait Store {
    /// Read the raw state document.
    ///
    /// Returns `None` if there is no document, or it cannot be read or parsed.
    fn load(&self) -> Option<Value>;

    /// Persist the state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state could not be written.
    fn save(&self, state: &State) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for &S {
    fn load(&self) -> Option<Value> {
        (**self).load()
    }

    fn save(&self, state: &State) -> Result<(), StoreError> {
        (**self).save(state)
    }
}

/// A store that is synchronised opportunistically.
///
/// Every [`Store`] can act as a remote.
pub trait RemoteStore {
    /// Fetch the remote copy of the state document.
    fn fetch(&self) -> Option<Value>;

    /// Push the state to the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote could not be updated.
    fn push(&self, state: &State) -> Result<(), StoreError>;
}

impl<S: Store> RemoteStore for S {
    fn fetch(&self) -> Option<Value> {
        self.load()
    }

    fn push(&self, state: &State) -> Result<(), StoreError> {
        self.save(state)
    }
}
