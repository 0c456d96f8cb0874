//! Purpose: Define the stable public API boundary for the bookstore crate.
//! Exports: Record type, store contract, backends, errors, and remote client.
//! Role: The only public path to core storage types for binaries and tests.

mod remote;

pub use crate::core::book::Book;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::memory::MemStore;
pub use crate::core::store::{Store, open_backend};
pub use remote::RemoteClient;
