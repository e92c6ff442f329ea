use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};

use crate::errors::BackendError;
use crate::persistence::Persistence;
use crate::record::Record;

/// An in-memory persistence adapter for tests.
#[derive(Default)]
pub struct MockPersistence {
    map: RwLock<HashMap<String, Vec<Record>>>,
}

impl MockPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the named collection's contents outside the normal
    /// save path.
    pub fn seed(&self, collection: impl AsRef<str>, records: Vec<Record>) {
        self.map
            .write()
            .unwrap()
            .insert(collection.as_ref().to_owned(), records);
    }

    /// Returns a copy of the named collection as currently persisted.
    pub fn snapshot(&self, collection: &str) -> Vec<Record> {
        self.map
            .read()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

impl Persistence for MockPersistence {
    fn load(&self, collection: &str) -> BoxFuture<'_, Result<Vec<Record>, BackendError>> {
        let records = self.snapshot(collection);

        async move { Ok(records) }.boxed()
    }

    fn save(
        &self,
        collection: &str,
        records: Vec<Record>,
    ) -> BoxFuture<'_, Result<(), BackendError>> {
        self.map
            .write()
            .unwrap()
            .insert(collection.to_owned(), records);

        async move { Ok(()) }.boxed()
    }
}
