//! Purpose: Define the `Book` record and its partial-update merge rule.
//! Exports: `Book`.
//! Role: Plain data crossing the store boundary; JSON shape is the wire shape.
//! Invariants: Empty string / empty authors mean "unset" for update merges.

use serde::{Deserialize, Serialize};

/// A single book record. `id` is caller-assigned and immutable once created;
/// the remaining fields are optional and decode to their empty values when
/// absent from a JSON body.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub press: String,
}

impl Book {
    /// Returns the record that results from applying `incoming` to `self`
    /// under the partial-update rule: non-empty incoming fields overwrite,
    /// empty ones leave the stored value unchanged. `id` never changes.
    pub fn merged_with(&self, incoming: &Book) -> Book {
        let mut next = self.clone();
        if !incoming.name.is_empty() {
            next.name = incoming.name.clone();
        }
        if !incoming.authors.is_empty() {
            next.authors = incoming.authors.clone();
        }
        if !incoming.press.is_empty() {
            next.press = incoming.press.clone();
        }
        next
    }
}
