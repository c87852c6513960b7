//! In-memory catalog source.

use std::collections::VecDeque;

use futures::future::BoxFuture;

use super::types::{CatalogError, Record};
use super::CatalogSource;

/// A catalog held entirely in memory.
///
/// Items are yielded in insertion order. Errors can be interleaved to
/// exercise skip and abort handling; a fatal error ends the sequence even if
/// more items were queued behind it.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    items: VecDeque<Result<Record, CatalogError>>,
    finished: bool,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog from a list of records.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            items: records.into_iter().map(Ok).collect(),
            finished: false,
        }
    }

    /// Appends a record.
    pub fn push(&mut self, record: Record) {
        self.items.push_back(Ok(record));
    }

    /// Appends an error.
    pub fn push_error(&mut self, error: CatalogError) {
        self.items.push_back(Err(error));
    }

    /// Number of items not yet yielded.
    pub fn remaining(&self) -> usize {
        if self.finished {
            0
        } else {
            self.items.len()
        }
    }
}

impl CatalogSource for MemoryCatalog {
    fn next_record(&mut self) -> BoxFuture<'_, Option<Result<Record, CatalogError>>> {
        let item = if self.finished {
            None
        } else {
            self.items.pop_front()
        };

        if matches!(item, Some(Err(CatalogError::Fatal { .. })) | None) {
            self.finished = true;
        }

        Box::pin(async move { item })
    }

    fn describe(&self) -> String {
        format!("memory:{} items", self.items.len())
    }
}
