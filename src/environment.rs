use std::sync::Arc;

use slog::Logger;

use crate::persistence::Persistence;
use crate::resource::{ResourceKind, PLAYLISTS, TRACKS};
use crate::store::ResourceStore;

/// Everything a request handler needs, cheap to clone per route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub tracks: Arc<ResourceStore>,
    pub playlists: Arc<ResourceStore>,
}

impl Environment {
    /// Creates a new instance with both resource stores sharing the
    /// given persistence adapter.
    pub fn new(logger: Arc<Logger>, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            logger,
            tracks: Arc::new(ResourceStore::new(&TRACKS, persistence.clone())),
            playlists: Arc::new(ResourceStore::new(&PLAYLISTS, persistence)),
        }
    }

    pub fn store(&self, kind: ResourceKind) -> &Arc<ResourceStore> {
        match kind {
            ResourceKind::Tracks => &self.tracks,
            ResourceKind::Playlists => &self.playlists,
        }
    }
}
