//! Purpose: Shared library crate used by the `bookstored` server binary and tests.
//! Exports: `core` (record model, store contract, backends, errors) and `api`.
//! Role: Internal library backing the binary; `api` is the stable boundary.
//! Invariants: All record state is owned by a `core::store::Store` backend.
pub mod api;
pub mod core;
