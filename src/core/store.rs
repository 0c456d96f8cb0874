//! Purpose: Define the storage contract and backend selection.
//! Exports: `Store`, `open_backend`.
//! Role: Capability-set abstraction decoupling the HTTP layer from a backend.
//! Invariants: Every value crossing the boundary is an independent copy.
//! Invariants: Concurrency control is internal to a backend, not part of the
//! contract; all methods take `&self` and are safe to call from concurrent
//! request handlers.

use std::sync::Arc;

use crate::core::book::Book;
use crate::core::error::{Error, ErrorKind};
use crate::core::memory::MemStore;

/// The storage capability set any backend must implement.
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Inserts a new record. Fails with `AlreadyExists` if the id is present.
    fn create(&self, book: &Book) -> Result<(), Error>;

    /// Merges the non-empty fields of `book` into the stored record with the
    /// same id. Fails with `NotFound` if the id is absent.
    fn update(&self, book: &Book) -> Result<(), Error>;

    /// Returns a copy of the record with the given id, or `NotFound`.
    fn get(&self, id: &str) -> Result<Book, Error>;

    /// Returns copies of all stored records in unspecified order. Empty store
    /// yields an empty vec, never an error.
    fn get_all(&self) -> Result<Vec<Book>, Error>;

    /// Removes the record with the given id, or fails with `NotFound`.
    fn delete(&self, id: &str) -> Result<(), Error>;
}

/// Constructs the backend named by a configuration string. Called once at
/// startup; the selected backend is handed to the HTTP layer explicitly
/// rather than registered in any global state.
pub fn open_backend(name: &str) -> Result<Arc<dyn Store>, Error> {
    match name {
        "mem" => Ok(Arc::new(MemStore::new())),
        other => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unknown storage backend: {other}"))
            .with_hint("Use --backend mem.")),
    }
}
