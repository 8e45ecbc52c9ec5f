//! Collection completeness
//!
//! Every owned movie lands in exactly one collection: its canonical one, or a
//! synthesized singleton when it has none. For canonical collections, each
//! member outside the owned-id set is a missing movie. The tracker memoizes
//! collection detail so a collection is fetched at most once per pass, no
//! matter how many owned movies point at it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use crate::services::metadata::{CollectionDetail, CollectionMember, MetadataSource, MovieDetail};

/// Where an owned movie is filed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    /// A real collection, by canonical collection id
    Canonical(i64),
    /// Singleton for a movie outside any collection, by canonical movie id
    Standalone(i64),
}

impl CollectionKey {
    pub fn for_movie(movie: &MovieDetail) -> Self {
        match &movie.collection {
            Some(collection) => CollectionKey::Canonical(collection.id),
            None => CollectionKey::Standalone(movie.id),
        }
    }

    /// Identifier stored in `collections.tmdb_id`
    pub fn storage_id(&self) -> String {
        match self {
            CollectionKey::Canonical(id) => id.to_string(),
            CollectionKey::Standalone(id) => format!("standalone-{}", id),
        }
    }
}

/// Per-pass state of the movie scan
#[derive(Debug, Default)]
pub struct CollectionTracker {
    owned: HashSet<i64>,
    // None memoizes a failed fetch, so it is not retried within the pass
    fetched: HashMap<i64, Option<Arc<CollectionDetail>>>,
}

impl CollectionTracker {
    /// Start a pass from the ids already known to be owned (library tags
    /// plus the catalog)
    pub fn new(owned: impl IntoIterator<Item = i64>) -> Self {
        Self {
            owned: owned.into_iter().collect(),
            fetched: HashMap::new(),
        }
    }

    /// Add an id resolved during this pass
    pub fn mark_owned(&mut self, id: i64) {
        self.owned.insert(id);
    }

    pub fn is_owned(&self, id: i64) -> bool {
        self.owned.contains(&id)
    }

    /// Number of distinct collections looked up so far
    pub fn visited(&self) -> usize {
        self.fetched.len()
    }

    /// Collection detail, fetched on the first visit only
    pub async fn collection(
        &mut self,
        collection_id: i64,
        source: &dyn MetadataSource,
    ) -> Option<Arc<CollectionDetail>> {
        if let Some(cached) = self.fetched.get(&collection_id) {
            return cached.clone();
        }

        let detail = match source.fetch_collection(collection_id).await {
            Ok(detail) => Some(Arc::new(detail)),
            Err(e) => {
                warn!(collection_id, error = %e, "Collection lookup failed, skipping its members");
                None
            }
        };

        self.fetched.insert(collection_id, detail.clone());
        detail
    }

    /// Members of `collection` not in the owned set
    pub fn missing_members<'a>(&self, collection: &'a CollectionDetail) -> Vec<&'a CollectionMember> {
        collection
            .members
            .iter()
            .filter(|member| !self.is_owned(member.id))
            .collect()
    }
}
