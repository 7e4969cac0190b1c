use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::errors::CrlResult;
use super::types::CachedCrl;

type CacheOutcome = CrlResult<Arc<CachedCrl>>;

/// Single-execution cell holding the outcome for one URI.
#[derive(Debug, Default)]
struct CacheSlot {
    outcome: OnceLock<CacheOutcome>,
    /// Stale CRL served again if the refresh filling this slot fails
    fallback: Option<Arc<CachedCrl>>,
}

impl CacheSlot {
    fn refreshing(stale: Arc<CachedCrl>) -> Self {
        Self {
            outcome: OnceLock::new(),
            fallback: Some(stale),
        }
    }
}

/// When a cached CRL stops being served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Entries live for the lifetime of the cache.
    #[default]
    Never,
    /// A successfully loaded CRL is reloaded once its `nextUpdate` has
    /// passed. Until a reload succeeds the previous CRL keeps being
    /// served. Failures and CRLs without `nextUpdate` are kept.
    NextUpdate,
}

/// Memoizes the fetch-then-parse outcome per distribution point URI.
///
/// Each URI maps to a single-execution cell: the first caller runs the
/// loader while concurrent callers for the same URI block until its
/// outcome is published. Failures are cached exactly like successes.
#[derive(Debug, Default)]
pub struct CrlCache {
    entries: DashMap<String, Arc<CacheSlot>>,
    expiry: ExpiryPolicy,
}

impl CrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expiry(expiry: ExpiryPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            expiry,
        }
    }

    /// The process-wide cache shared by checkers that are not given one.
    pub fn shared() -> Arc<CrlCache> {
        static SHARED: OnceLock<Arc<CrlCache>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(CrlCache::new())))
    }

    pub fn expiry(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Return the cached outcome for `uri`, running `loader` if no outcome
    /// has been recorded yet.
    ///
    /// Under [`ExpiryPolicy::NextUpdate`] a stale CRL is swapped for a
    /// fresh slot that remembers it; a failed refresh publishes the stale
    /// CRL again so the next lookup retries.
    pub fn get_or_load<F>(&self, uri: &str, loader: F) -> CacheOutcome
    where
        F: FnOnce() -> CrlResult<CachedCrl>,
    {
        let mut loader = Some(loader);
        let mut refreshed = false;

        loop {
            // The shard guard is released before any loader runs
            let slot = Arc::clone(&self.entries.entry(uri.to_string()).or_default());

            if let Some(outcome) = slot.outcome.get() {
                // A lookup refreshes at most once
                if let Ok(crl) = outcome
                    && !refreshed
                    && self.is_stale(crl)
                {
                    refreshed = true;
                    debug!("Cached CRL from {} has passed nextUpdate, reloading", uri);
                    if let Some(mut current) = self.entries.get_mut(uri)
                        && Arc::ptr_eq(&*current, &slot)
                    {
                        *current = Arc::new(CacheSlot::refreshing(Arc::clone(crl)));
                    }
                    continue;
                }
                debug!("Using cached CRL outcome for {}", uri);
                return outcome.clone();
            }

            let mut ran = false;
            let outcome = slot.outcome.get_or_init(|| {
                ran = true;
                let loaded = match loader.take() {
                    Some(load) => load().map(Arc::new),
                    None => unreachable!("loader runs at most once per lookup"),
                };
                match (loaded, &slot.fallback) {
                    (Err(e), Some(stale)) => {
                        warn!(
                            "Refreshing CRL from {} failed, serving the previous one: {}",
                            uri, e
                        );
                        Ok(Arc::clone(stale))
                    }
                    (loaded, _) => loaded,
                }
            });

            if ran {
                match outcome {
                    Ok(crl) => info!(
                        "Cached CRL from {} ({} revoked certificates)",
                        uri,
                        crl.revoked_count()
                    ),
                    Err(e) => info!("Cached failure for {}: {}", uri, e),
                }
            }

            return outcome.clone();
        }
    }

    fn is_stale(&self, crl: &CachedCrl) -> bool {
        self.expiry == ExpiryPolicy::NextUpdate && crl.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Number of URIs with a recorded or in-flight outcome
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an outcome for `uri` has been published
    pub fn contains(&self, uri: &str) -> bool {
        self.entries
            .get(uri)
            .is_some_and(|slot| slot.outcome.get().is_some())
    }

    /// Peek at the published outcome for `uri` without loading it.
    pub fn get(&self, uri: &str) -> Option<CacheOutcome> {
        self.entries
            .get(uri)
            .and_then(|slot| slot.outcome.get().cloned())
    }

    /// Forget the outcome for `uri`; the next lookup loads it again.
    pub fn invalidate(&self, uri: &str) -> bool {
        self.entries.remove(uri).is_some()
    }

    /// Clear the CRL cache
    pub fn clear(&self) {
        self.entries.clear();
        info!("CRL cache cleared");
    }

    /// Remove CRLs whose `nextUpdate` is before `now`.
    ///
    /// Returns the number of removed entries.
    pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
        let initial_size = self.entries.len();
        self.entries.retain(|_, slot| match slot.outcome.get() {
            Some(Ok(crl)) => !crl.is_expired_at(now),
            _ => true,
        });
        let removed = initial_size.saturating_sub(self.entries.len());

        if removed > 0 {
            info!("Removed {} expired CRLs from cache", removed);
        }

        removed
    }
}
