//! Rendered page cache.
//!
//! Public pages are rendered from the database at most once per TTL and
//! served from memory in between. Content actions invalidate the paths that
//! display what they changed, so the next request re-reads the database.
//! Concurrent misses for the same path share one render.
//!
//! Entries are keyed by path and the path's generation. Invalidating a path
//! bumps its generation, so a render that was already in flight stores its
//! result under a key nobody reads again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::future::Cache;

use crate::error::AppError;

/// Maximum number of cached pages.
const MAX_PAGES: u64 = 1_000;

/// Path-keyed cache of rendered HTML.
#[derive(Clone)]
pub struct PageCache {
    pages: Cache<(String, u64), Arc<String>>,
    generations: Arc<Mutex<HashMap<String, u64>>>,
}

impl PageCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            pages: Cache::builder()
                .max_capacity(MAX_PAGES)
                .time_to_live(ttl)
                .build(),
            generations: Arc::default(),
        }
    }

    fn key(&self, path: &str) -> (String, u64) {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (path.to_owned(), generations.get(path).copied().unwrap_or(0))
    }

    /// Advance the generation of `path`, returning the retired key.
    fn retire(&self, path: &str) -> (String, u64) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let generation = generations.entry(path.to_owned()).or_insert(0);
        let retired = *generation;
        *generation += 1;
        (path.to_owned(), retired)
    }

    /// The cached page for `path`, rendering and storing it on a miss.
    ///
    /// Failed renders are not cached.
    ///
    /// # Errors
    ///
    /// Returns the render's error.
    pub async fn get_or_render<F>(&self, path: &str, render: F) -> Result<Arc<String>, AppError>
    where
        F: Future<Output = Result<String, AppError>>,
    {
        self.pages
            .try_get_with(self.key(path), async { render.await.map(Arc::new) })
            .await
            .map_err(|e| Arc::try_unwrap(e).unwrap_or_else(|shared| shared.as_ref().to_shared()))
    }

    /// Drop the cached pages for `paths`.
    pub async fn invalidate<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = path.as_ref();
            tracing::debug!(path = %path, "Invalidating cached page");
            self.pages.invalidate(&self.retire(path)).await;
        }
    }

    /// Whether `path` is currently cached.
    pub async fn contains(&self, path: &str) -> bool {
        self.pages.get(&self.key(path)).await.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_renders_once_until_invalidated() {
        let cache = PageCache::new(Duration::from_secs(60));
        let renders = AtomicUsize::new(0);
        let render = || async {
            renders.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AppError>("<h1>Work</h1>".to_string())
        };

        cache.get_or_render("/work", render()).await.unwrap();
        cache.get_or_render("/work", render()).await.unwrap();
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        cache.invalidate(["/work", "/admin/projects"]).await;
        assert!(!cache.contains("/work").await);

        cache.get_or_render("/work", render()).await.unwrap();
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_render_in_flight_during_invalidation_is_not_served() {
        let cache = PageCache::new(Duration::from_secs(60));
        let (started_tx, started) = tokio::sync::oneshot::channel::<()>();
        let (release, released) = tokio::sync::oneshot::channel::<()>();

        let in_flight = tokio::spawn({
            let cache = cache.clone();
            async move {
                cache
                    .get_or_render("/work/1", async {
                        started_tx.send(()).ok();
                        released.await.ok();
                        Ok("<h1>Deleted project</h1>".to_string())
                    })
                    .await
            }
        });
        started.await.unwrap();

        cache.invalidate(["/work/1"]).await;
        release.send(()).unwrap();
        in_flight.await.unwrap().unwrap();

        assert!(!cache.contains("/work/1").await);
        let err = cache
            .get_or_render("/work/1", async {
                Err(AppError::NotFound("project".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = PageCache::new(Duration::from_secs(60));

        let err = cache
            .get_or_render("/blog/missing", async {
                Err(AppError::NotFound("post".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!cache.contains("/blog/missing").await);
    }
}
