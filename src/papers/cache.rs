use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::debug;

use super::{Paper, PaperSource, SourceError};

type CacheKey = (String, usize);

/// Memoizes another source's results by `(topic, max_results)`.
///
/// Bounded by an LRU policy; a capacity of zero turns memoization off.
/// Failed fetches are never cached.
pub struct CachedSource<S> {
    inner: S,
    cache: Option<Mutex<LruCache<CacheKey, Vec<Paper>>>>,
}

impl<S: PaperSource> CachedSource<S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.lock().ok().map(|c| c.len()))
            .unwrap_or(0)
    }

    fn lookup(&self, key: &CacheKey) -> Option<Vec<Paper>> {
        let cache = self.cache.as_ref()?;
        let mut cache = cache.lock().ok()?;
        cache.get(key).cloned()
    }

    fn store(&self, key: CacheKey, papers: &[Paper]) {
        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                cache.put(key, papers.to_vec());
            }
        }
    }
}

#[async_trait]
impl<S: PaperSource> PaperSource for CachedSource<S> {
    async fn fetch(&self, topic: &str, max_results: usize) -> Result<Vec<Paper>, SourceError> {
        let key = (topic.to_string(), max_results);
        if let Some(papers) = self.lookup(&key) {
            debug!(topic, max_results, "paper source cache hit");
            return Ok(papers);
        }

        let papers = self.inner.fetch(topic, max_results).await?;
        self.store(key, &papers);
        Ok(papers)
    }
}
