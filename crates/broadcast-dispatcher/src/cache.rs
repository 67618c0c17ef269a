//! Query-cache invalidation gateway.

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hierarchical cache key, e.g. `["posts", "feed", "alice"]`.
pub type QueryKey = Vec<String>;

/// Named predicate over cache keys.
#[derive(Clone)]
pub struct QueryPredicate {
    name: String,
    matcher: Arc<dyn Fn(&[String]) -> bool + Send + Sync>,
}

impl QueryPredicate {
    pub fn new(
        name: impl Into<String>,
        matcher: impl Fn(&[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            matcher: Arc::new(matcher),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, key: &[String]) -> bool {
        (self.matcher)(key)
    }
}

impl fmt::Debug for QueryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One invalidation request.
#[derive(Debug, Clone)]
pub enum InvalidationTarget {
    /// Every cached key starting with this prefix.
    Key(QueryKey),
    Predicate(QueryPredicate),
}

impl InvalidationTarget {
    pub fn key<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        InvalidationTarget::Key(parts.into_iter().map(Into::into).collect())
    }

    pub fn predicate(
        name: impl Into<String>,
        matcher: impl Fn(&[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        InvalidationTarget::Predicate(QueryPredicate::new(name, matcher))
    }

    pub fn matches(&self, key: &[String]) -> bool {
        match self {
            InvalidationTarget::Key(prefix) => key.starts_with(prefix),
            InvalidationTarget::Predicate(predicate) => predicate.matches(key),
        }
    }

    // An empty prefix matches everything.
    fn is_blank(&self) -> bool {
        matches!(self, InvalidationTarget::Key(prefix) if prefix.is_empty())
    }
}

/// Query cache that can mark entries stale.
#[async_trait]
pub trait QueryCache: Send + Sync {
    async fn invalidate(&self, target: &InvalidationTarget);
}

/// Filters and fans out invalidation requests to a [`QueryCache`].
#[derive(Clone)]
pub struct CacheInvalidationGateway {
    cache: Arc<dyn QueryCache>,
}

impl CacheInvalidationGateway {
    pub fn new(cache: Arc<dyn QueryCache>) -> Self {
        Self { cache }
    }

    /// Invalidate every present, non-blank entry in parallel.
    ///
    /// Returns the number of invalidations issued.
    pub async fn invalidate_queries(&self, entries: Vec<Option<InvalidationTarget>>) -> usize {
        let total = entries.len();
        let targets: Vec<InvalidationTarget> = entries
            .into_iter()
            .flatten()
            .filter(|target| {
                if target.is_blank() {
                    warn!("Skipping empty invalidation key");
                    return false;
                }
                true
            })
            .collect();

        debug!(
            requested = total,
            issued = targets.len(),
            "Invalidating queries"
        );

        join_all(targets.iter().map(|target| self.cache.invalidate(target))).await;
        targets.len()
    }
}

/// In-process query cache keyed by [`QueryKey`].
#[derive(Default)]
pub struct MemoryQueryCache {
    keys: Mutex<BTreeSet<QueryKey>>,
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&self, parts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys
            .lock()
            .insert(parts.into_iter().map(Into::into).collect());
    }

    pub fn contains(&self, key: &[&str]) -> bool {
        self.keys
            .lock()
            .iter()
            .any(|k| k.iter().map(String::as_str).eq(key.iter().copied()))
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

#[async_trait]
impl QueryCache for MemoryQueryCache {
    async fn invalidate(&self, target: &InvalidationTarget) {
        self.keys.lock().retain(|key| !target.matches(key));
    }
}
