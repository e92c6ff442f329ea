use std::io;
use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use tempfile::NamedTempFile;

use crate::errors::BackendError;
use crate::record::Record;

pub mod mock;

/// Reads and writes a named collection as a whole document. There are
/// no partial updates at this layer: callers load, modify, and save.
pub trait Persistence: Send + Sync {
    /// Loads the named collection. An absent or unparseable backing
    /// document reads as an empty collection.
    fn load(&self, collection: &str) -> BoxFuture<'_, Result<Vec<Record>, BackendError>>;

    /// Overwrites the named collection's backing document. Concurrent
    /// saves are not coordinated here; the last save wins.
    fn save(
        &self,
        collection: &str,
        records: Vec<Record>,
    ) -> BoxFuture<'_, Result<(), BackendError>>;
}

/// A persistence adapter that keeps one `<collection>.json` document
/// per collection under a single directory.
pub struct FilePersistence {
    directory: PathBuf,
}

impl FilePersistence {
    /// Creates a new instance over the given data directory.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn document_path(&self, collection: &str) -> PathBuf {
        self.directory.join(format!("{}.json", collection))
    }
}

impl Persistence for FilePersistence {
    fn load(&self, collection: &str) -> BoxFuture<'_, Result<Vec<Record>, BackendError>> {
        let path = self.document_path(collection);

        async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_default()),
                Err(_) => Ok(Vec::new()),
            }
        }
        .boxed()
    }

    fn save(
        &self,
        collection: &str,
        records: Vec<Record>,
    ) -> BoxFuture<'_, Result<(), BackendError>> {
        let path = self.document_path(collection);
        let directory = self.directory.clone();

        async move {
            let bytes = serde_json::to_vec_pretty(&records)
                .map_err(|source| BackendError::MalformedDocument { source })?;

            tokio::task::spawn_blocking(move || write_atomically(&directory, &path, &bytes))
                .await
                .map_err(|e| BackendError::Storage {
                    source: io::Error::new(io::ErrorKind::Other, e),
                })?
        }
        .boxed()
    }
}

// The temporary file must live in the target directory so the final
// rename stays on one filesystem.
fn write_atomically(directory: &Path, path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    use std::io::Write;

    let mut file =
        NamedTempFile::new_in(directory).map_err(|source| BackendError::Storage { source })?;
    file.write_all(bytes)
        .map_err(|source| BackendError::Storage { source })?;
    file.persist(path).map_err(|e| BackendError::Storage {
        source: e.error,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::record::Record;

    fn track(id: i64, naam: &str) -> Record {
        let mut record = Record::new();
        record.insert("id".to_owned(), json!(id));
        record.insert("naam".to_owned(), json!(naam));
        record
    }

    #[tokio::test]
    async fn saves_and_reloads_a_collection() {
        let directory = tempfile::tempdir().expect("create temporary directory");
        let persistence = FilePersistence::new(directory.path());

        let records = vec![track(1, "Eerste"), track(2, "Tweede")];
        persistence
            .save("tracks", records.clone())
            .await
            .expect("save collection");

        let reloaded = persistence.load("tracks").await.expect("load collection");
        assert_eq!(reloaded, records);
    }

    #[tokio::test]
    async fn absent_document_reads_as_empty() {
        let directory = tempfile::tempdir().expect("create temporary directory");
        let persistence = FilePersistence::new(directory.path());

        let records = persistence.load("tracks").await.expect("load collection");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn unparseable_document_reads_as_empty() {
        let directory = tempfile::tempdir().expect("create temporary directory");
        std::fs::write(directory.path().join("tracks.json"), b"not json at all")
            .expect("write corrupt document");

        let persistence = FilePersistence::new(directory.path());
        let records = persistence.load("tracks").await.expect("load collection");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn save_replaces_the_whole_document() {
        let directory = tempfile::tempdir().expect("create temporary directory");
        let persistence = FilePersistence::new(directory.path());

        persistence
            .save("tracks", vec![track(1, "Eerste"), track(2, "Tweede")])
            .await
            .expect("save collection");
        persistence
            .save("tracks", vec![track(3, "Derde")])
            .await
            .expect("overwrite collection");

        let reloaded = persistence.load("tracks").await.expect("load collection");
        assert_eq!(reloaded, vec![track(3, "Derde")]);
    }
}
