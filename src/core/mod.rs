// Core modules implementing the record model, store contract, and error modeling.
pub mod book;
pub mod error;
pub mod memory;
pub mod store;
