//! Purpose: In-memory `Store` backend over a guarded id-to-record map.
//! Exports: `MemStore`.
//! Role: The one concrete backend; sole holder of record state in-process.
//! Invariants: Check-then-insert and read-modify-write run under the
//! exclusive lock, so operations on the same id are totally ordered.
//! Invariants: Values are cloned in and cloned out; callers never alias
//! store-internal state.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::book::Book;
use crate::core::error::{Error, ErrorKind};
use crate::core::store::Store;

#[derive(Debug)]
pub struct MemStore {
    books: RwLock<HashMap<String, Book>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
        }
    }

    // The map holds plain data, so a panic mid-operation cannot leave a torn
    // record; a poisoned guard is recovered rather than surfaced.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Book>> {
        self.books
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Book>> {
        self.books
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemStore {
    fn create(&self, book: &Book) -> Result<(), Error> {
        let mut books = self.write();
        if books.contains_key(&book.id) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("book already exists")
                .with_id(&book.id));
        }
        books.insert(book.id.clone(), book.clone());
        Ok(())
    }

    fn update(&self, book: &Book) -> Result<(), Error> {
        let mut books = self.write();
        let existing = books.get(&book.id).ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("no book with this id")
                .with_id(&book.id)
        })?;
        let next = existing.merged_with(book);
        books.insert(book.id.clone(), next);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Book, Error> {
        self.read().get(id).cloned().ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("no book with this id")
                .with_id(id)
        })
    }

    fn get_all(&self) -> Result<Vec<Book>, Error> {
        Ok(self.read().values().cloned().collect())
    }

    fn delete(&self, id: &str) -> Result<(), Error> {
        let mut books = self.write();
        if books.remove(id).is_none() {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("no book with this id")
                .with_id(id));
        }
        Ok(())
    }
}
