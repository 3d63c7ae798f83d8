//! Query cache with staleness, cancellation and snapshots.
//!
//! Entries are keyed by resource and parameters. Reads never block on
//! staleness: a stale entry is still returned by [`QueryCache::get`] for
//! display, while [`QueryCache::fetch`] refetches it.
//!
//! Cancellation is generation based: [`QueryCache::cancel`] bumps the key's
//! generation, and a fetch that started under an older generation drops its
//! result instead of overwriting a newer optimistic value.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use moka::future::Cache;

use cookbook_core::{
    Account, AccountId, Recipe, RecipeId, RecipePage, RecipeSummary, ShoppingList,
};

use crate::api::{ClientError, ListParams};

const MAX_ENTRIES: u64 = 1000;
/// Cancellation counters kept before they are pruned.
const GENERATION_LIMIT: usize = 1000;

/// Stale time for single recipes and the account.
pub const DETAIL_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Cache key: resource plus the parameters it was fetched with.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    RecipeList(ListParams),
    Recipe(RecipeId),
    Selection { category: Option<String> },
    ShoppingList,
    Account(AccountId),
}

impl QueryKey {
    /// How long a fetched value counts as fresh.
    #[must_use]
    pub const fn stale_time(&self) -> Duration {
        match self {
            Self::Recipe(_) | Self::Account(_) => DETAIL_STALE_TIME,
            Self::RecipeList(_) | Self::Selection { .. } | Self::ShoppingList => Duration::ZERO,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    /// Pages loaded so far, in order.
    RecipeList(Vec<RecipePage>),
    Recipe(Box<Recipe>),
    Selection(Vec<RecipeSummary>),
    ShoppingList(ShoppingList),
    Account(Account),
}

/// Conversion between typed values and [`CachedValue`].
pub trait Cacheable: Sized {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: CachedValue) -> Option<Self>;
}

macro_rules! cacheable {
    ($ty:ty, $variant:ident) => {
        impl Cacheable for $ty {
            fn into_cached(self) -> CachedValue {
                CachedValue::$variant(self)
            }

            fn from_cached(value: CachedValue) -> Option<Self> {
                match value {
                    CachedValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(Vec<RecipePage>, RecipeList);
cacheable!(Vec<RecipeSummary>, Selection);
cacheable!(ShoppingList, ShoppingList);
cacheable!(Account, Account);

impl Cacheable for Recipe {
    fn into_cached(self) -> CachedValue {
        CachedValue::Recipe(Box::new(self))
    }

    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Recipe(recipe) => Some(*recipe),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, key: &QueryKey) -> bool {
        self.fetched_at.elapsed() < key.stale_time()
    }
}

/// Point in a key's cancellation history, taken before an await.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    key: u64,
}

/// Values of a set of keys captured before an optimistic write.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: Vec<(QueryKey, Option<CacheEntry>)>,
}

/// Shared query cache.
///
/// Cheap to clone; clones share entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<QueryCacheInner>,
}

struct QueryCacheInner {
    entries: Cache<QueryKey, CacheEntry>,
    generations: Mutex<HashMap<QueryKey, u64>>,
    /// Bumped by [`QueryCache::clear`] to cancel every key at once.
    epoch: AtomicU64,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueryCacheInner {
                entries: Cache::builder().max_capacity(MAX_ENTRIES).build(),
                generations: Mutex::new(HashMap::new()),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// The key's current generation. Pass it to [`Self::set_if_current`]
    /// after an await to store a result only if nothing cancelled the key
    /// in between.
    #[must_use]
    pub fn generation(&self, key: &QueryKey) -> Generation {
        let key_generation = self
            .inner
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or_default();
        Generation {
            epoch: self.inner.epoch.load(Ordering::Acquire),
            key: key_generation,
        }
    }

    /// The cached value, fresh or stale.
    pub async fn get<T: Cacheable>(&self, key: &QueryKey) -> Option<T> {
        let entry = self.inner.entries.get(key).await?;
        T::from_cached(entry.value)
    }

    /// Whether the key holds a value younger than its stale time.
    pub async fn is_fresh(&self, key: &QueryKey) -> bool {
        self.inner
            .entries
            .get(key)
            .await
            .is_some_and(|entry| entry.is_fresh(key))
    }

    /// Return the fresh cached value, or run `fetcher` and cache its result.
    ///
    /// The result is stored only if the key was not cancelled while the
    /// fetch was in flight; it is returned to the caller either way.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error; the cache is left untouched.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, ClientError>
    where
        T: Cacheable + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if let Some(entry) = self.inner.entries.get(&key).await
            && entry.is_fresh(&key)
            && let Some(value) = T::from_cached(entry.value)
        {
            return Ok(value);
        }

        let started = self.generation(&key);
        let value = fetcher().await?;
        self.set_if_current(key, started, value.clone()).await;
        Ok(value)
    }

    /// Store a value as freshly fetched.
    pub async fn set<T: Cacheable>(&self, key: QueryKey, value: T) {
        let entry = CacheEntry {
            value: value.into_cached(),
            fetched_at: Instant::now(),
        };
        self.inner.entries.insert(key, entry).await;
    }

    /// Store `value` unless `key` was cancelled since `started` was taken.
    /// Returns whether the value was stored.
    pub async fn set_if_current<T: Cacheable>(
        &self,
        key: QueryKey,
        started: Generation,
        value: T,
    ) -> bool {
        if self.generation(&key) != started {
            tracing::debug!(?key, "discarding result for cancelled query");
            return false;
        }
        self.set(key, value).await;
        true
    }

    /// Drop the results of fetches for `key` that are still in flight.
    pub fn cancel(&self, key: &QueryKey) {
        let mut generations = self
            .inner
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if generations.len() >= GENERATION_LIMIT && !generations.contains_key(key) {
            // Pruned counters restart at zero; the epoch bump keeps older
            // generations from matching them.
            self.inner.epoch.fetch_add(1, Ordering::AcqRel);
            generations.clear();
        }
        *generations.entry(key.clone()).or_default() += 1;
    }

    /// Remove a key so the next access refetches it.
    pub async fn invalidate(&self, key: &QueryKey) {
        self.cancel(key);
        self.inner.entries.invalidate(key).await;
    }

    /// Drop every entry and every in-flight fetch, e.g. on sign-out.
    pub async fn clear(&self) {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        self.inner
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner.entries.invalidate_all();
        self.inner.entries.run_pending_tasks().await;
    }

    /// Capture the current entries of `keys`.
    pub async fn snapshot(&self, keys: &[QueryKey]) -> Snapshot {
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            entries.push((key.clone(), self.inner.entries.get(key).await));
        }
        Snapshot { entries }
    }

    /// Put back the entries captured by [`Self::snapshot`]; keys that were
    /// empty then are removed.
    pub async fn restore(&self, snapshot: Snapshot) {
        for (key, entry) in snapshot.entries {
            self.cancel(&key);
            match entry {
                Some(entry) => self.inner.entries.insert(key, entry).await,
                None => self.inner.entries.invalidate(&key).await,
            }
        }
    }
}
