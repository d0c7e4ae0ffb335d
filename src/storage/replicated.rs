use serde_json::Value;

use crate::{
    domain::State,
    storage::{RemoteStore, Store, StoreError},
};

/// A local store mirrored to an optional remote.
///
/// The local store is authoritative: its failures are returned to the caller.
/// Pushes to the remote are best-effort, and failures are only logged.
#[derive(Debug)]
pub struct Replicated<L, R> {
    local: L,
    remote: Option<R>,
}

impl<L, R> Replicated<L, R> {
    /// Mirror `local` to `remote`, if there is one.
    pub const fn new(local: L, remote: Option<R>) -> Self {
        Self { local, remote }
    }

    /// The local store.
    pub const fn local(&self) -> &L {
        &self.local
    }

    /// The remote store, if configured.
    pub const fn remote(&self) -> Option<&R> {
        self.remote.as_ref()
    }
}

impl<L: Store, R: RemoteStore> Replicated<L, R> {
    /// Fetch the remote copy of the state, if a remote is configured and has
    /// one.
    pub fn fetch_remote(&self) -> Option<Value> {
        self.remote.as_ref()?.fetch()
    }
}

impl<L: Store, R: RemoteStore> Store for Replicated<L, R> {
    fn load(&self) -> Option<Value> {
        self.local.load()
    }

    fn save(&self, state: &State) -> Result<(), StoreError> {
        self.local.save(state)?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.push(state) {
                tracing::debug!("Remote push failed; local copy is authoritative: {e}");
            }
        }
        Ok(())
    }
}
