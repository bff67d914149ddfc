use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::Instant,
};

use tracing::{info, warn};

use super::{
    bookmark::Bookmark,
    client::{LinkdingClient, LinkdingError},
};
use crate::{common::Item, plugins::index::Index};

#[derive(Default)]
struct Snapshot {
    index: Index,
    bookmarks: HashMap<String, Bookmark>,
}

/// Owns the current index. The refresh thread and the event loop share it;
/// whoever finishes a fetch last wins.
pub struct Indexer {
    client: RwLock<Arc<LinkdingClient>>,
    snapshot: RwLock<Snapshot>,
}

impl Indexer {
    pub fn new(client: LinkdingClient) -> Self {
        Self {
            client: RwLock::new(Arc::new(client)),
            snapshot: RwLock::default(),
        }
    }

    pub fn client(&self) -> Arc<LinkdingClient> {
        Arc::clone(&self.client.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn set_client(&self, client: LinkdingClient) {
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(client);
    }

    pub fn update_index_items(&self) {
        let start = Instant::now();
        let bookmarks = self.client().fetch_bookmarks();

        let index = Index::new(bookmarks.iter().map(Bookmark::to_index_item).collect());
        let count = index.len();
        let bookmarks = bookmarks
            .into_iter()
            .map(|bookmark| (bookmark.id.to_string(), bookmark))
            .collect();

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) =
            Snapshot { index, bookmarks };
        info!(
            "Indexed {count} links [{} ms]",
            start.elapsed().as_millis()
        );
    }

    pub fn find(&self, query: &str, limit: usize) -> Vec<Item> {
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        snapshot
            .index
            .find(query, limit)
            .into_iter()
            .map(|m| m.index_item.item.clone())
            .collect()
    }

    pub fn bookmark(&self, id: &str) -> Option<Bookmark> {
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        snapshot.bookmarks.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        snapshot.index.len()
    }

    /// Runs a change against the API and re-fetches everything when it
    /// succeeds. Failures are only logged.
    pub fn mutate(&self, change: impl FnOnce(&LinkdingClient) -> Result<(), LinkdingError>) {
        let client = self.client();
        match change(&client) {
            Ok(()) => self.update_index_items(),
            Err(err) => warn!("{err}"),
        }
    }
}
