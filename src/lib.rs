pub mod api;
pub mod browse;
pub mod collections;
pub mod config;
pub mod db;
pub mod fetch;
pub mod mapping;
pub mod media;
pub mod storage;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::browse::{BrowseOptions, BrowsePage, SortKey};
    pub use crate::collections::{CategoryGroup, Collection};
    pub use crate::config::Config;
    pub use crate::media::MediaItem;
    pub use crate::{AggregateError, CacheStats, Multiverse, SearchOutcome};
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::browse::{BrowseOptions, BrowsePage};
use crate::collections::Collection;
use crate::config::Config;
use crate::db::Database;
use crate::fetch::{fetch_all, CollectionBackend, HttpBackend, ListQuery};
use crate::mapping::{normalize, normalize_all};
use crate::media::MediaItem;
use crate::storage::Storage;

/// Key under which the last-used browse selection persists across sessions.
const FILTERS_KEY: &str = "courses:filters";

/// Errors surfaced by a fetch cycle. Per-collection failures are not errors
/// (they ride along in `SearchOutcome::partial_failures`); only a cycle
/// where every collection failed is.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// All collections failed this cycle. Distinct from an empty-but-
    /// successful result, and never overwrites cached data.
    #[error("all {attempted} collections failed; first error: {first_error}")]
    TotalFetchFailure { attempted: usize, first_error: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result of one search cycle.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Combined, de-duplicated, capped items in collection order.
    pub items: Vec<MediaItem>,
    /// Collections that failed this cycle, with their error messages.
    /// Empty when served from cache.
    pub partial_failures: Vec<(Collection, String)>,
    pub from_cache: bool,
    /// True when a newer search started while this cycle was in flight;
    /// display layers should drop the outcome (its cache entry, keyed by
    /// this cycle's own query, is still written).
    pub superseded: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub entries: u64,
    pub expired_entries: u64,
}

/// Async library entry point. Owns the backend client and the cache store,
/// and runs the fetch/normalize/cache/merge cycle behind `search`.
pub struct Multiverse {
    backend: Arc<dyn CollectionBackend>,
    store: Arc<dyn Storage>,
    config: Config,
    // Bumped per search cycle; a cycle resolving under an older generation
    // was superseded by a newer query.
    generation: AtomicU64,
}

impl Multiverse {
    /// Connect the HTTP backend and the persistent cache database described
    /// by `config`, running cache migrations.
    pub async fn connect(config: Config) -> Result<Self> {
        let backend = HttpBackend::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let db = Database::connect(config.database_url.as_deref()).await?;
        db.run_migrations().await?;
        Ok(Self::with_parts(Arc::new(backend), Arc::new(db), config))
    }

    /// Assemble from explicit parts. Embedders and tests inject their own
    /// backend/storage here.
    pub fn with_parts(
        backend: Arc<dyn CollectionBackend>,
        store: Arc<dyn Storage>,
        config: Config,
    ) -> Self {
        Self {
            backend,
            store,
            config,
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Search the combined catalog for `term`, serving from cache when
    /// fresh. Fans out over `Collection::SEARCHED`; the drama collections
    /// are reachable via `collection_items` and `detail` only.
    pub async fn search(&self, term: &str) -> Result<SearchOutcome, AggregateError> {
        self.search_with_refresh(term, false).await
    }

    /// Like `search`, but `refresh` bypasses the cache read (a successful
    /// cycle still writes back).
    pub async fn search_with_refresh(
        &self,
        term: &str,
        refresh: bool,
    ) -> Result<SearchOutcome, AggregateError> {
        let norm = norm_query(term);
        let now = current_epoch();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let key = cache_key("all", &norm);

        if !refresh {
            if let Some(items) = self.read_cached_items(&key, now).await {
                debug!(key = %key, count = items.len(), "cache hit");
                return Ok(SearchOutcome {
                    items,
                    partial_failures: Vec::new(),
                    from_cache: true,
                    superseded: false,
                });
            }
            debug!(key = %key, "cache miss");
        }

        let query = ListQuery::search(term, self.config.fetch_limit);
        let outcomes = fetch_all(self.backend.as_ref(), &Collection::SEARCHED, &query).await;

        let mut items: Vec<MediaItem> = Vec::new();
        let mut failures: Vec<(Collection, String)> = Vec::new();
        let mut succeeded: Vec<Collection> = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(raws) => {
                    items.extend(normalize_all(&raws, outcome.collection));
                    succeeded.push(outcome.collection);
                }
                Err(e) => failures.push((outcome.collection, e)),
            }
        }

        if succeeded.is_empty() {
            // Deliberately no cache write: stale data beats an empty set.
            return Err(AggregateError::TotalFetchFailure {
                attempted: Collection::SEARCHED.len(),
                first_error: failures
                    .first()
                    .map(|(_, e)| e.clone())
                    .unwrap_or_default(),
            });
        }

        let mut items = dedupe_last_wins(items);
        items.truncate(self.config.max_results);

        self.write_back(&norm, &items, &succeeded, now).await?;

        let superseded = self.generation.load(Ordering::SeqCst) != generation;
        Ok(SearchOutcome {
            items,
            partial_failures: failures,
            from_cache: false,
            superseded,
        })
    }

    /// Inline search: smaller per-collection limit, combined cap of
    /// `quick_cap` (8 by default), no caching.
    pub async fn quick_search(&self, term: &str) -> Result<Vec<MediaItem>, AggregateError> {
        let query = ListQuery::search(term, self.config.quick_limit);
        let outcomes = fetch_all(self.backend.as_ref(), &Collection::SEARCHED, &query).await;

        let mut items: Vec<MediaItem> = Vec::new();
        let mut all_failed = true;
        let mut first_error = String::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(raws) => {
                    all_failed = false;
                    items.extend(normalize_all(&raws, outcome.collection));
                }
                Err(e) => {
                    if first_error.is_empty() {
                        first_error = e;
                    }
                }
            }
        }
        if all_failed {
            return Err(AggregateError::TotalFetchFailure {
                attempted: Collection::SEARCHED.len(),
                first_error,
            });
        }
        let mut items = dedupe_last_wins(items);
        items.truncate(self.config.quick_cap);
        Ok(items)
    }

    /// Filtered/sorted/paginated page over the combined set for `term`
    /// (cached when fresh).
    pub async fn browse(
        &self,
        term: &str,
        opts: &BrowseOptions,
    ) -> Result<BrowsePage, AggregateError> {
        let outcome = self.search(term).await?;
        Ok(browse::apply(&outcome.items, opts))
    }

    /// Items for a single collection, reusing the per-collection cache
    /// entries written by full search cycles.
    pub async fn collection_items(
        &self,
        collection: Collection,
        term: &str,
    ) -> Result<Vec<MediaItem>, AggregateError> {
        let norm = norm_query(term);
        let now = current_epoch();
        let key = cache_key(collection.as_str(), &norm);
        if let Some(items) = self.read_cached_items(&key, now).await {
            debug!(key = %key, "collection cache hit");
            return Ok(items);
        }

        let query = ListQuery::search(term, self.config.fetch_limit);
        let outcomes = fetch_all(self.backend.as_ref(), &[collection], &query).await;
        let outcome = outcomes
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no fetch outcome for {collection}"))?;
        let raws = outcome.result.map_err(|e| AggregateError::TotalFetchFailure {
            attempted: 1,
            first_error: e,
        })?;
        let items = dedupe_last_wins(normalize_all(&raws, collection));
        let payload = serde_json::to_string(&items).context("serializing cache payload")?;
        self.store
            .put_cache(&key, &payload, now + self.config.search_ttl_secs)
            .await?;
        Ok(items)
    }

    /// Newest items across the feed collections, ordered by update time.
    pub async fn latest_updates(&self, limit: usize) -> Result<Vec<MediaItem>, AggregateError> {
        let query = ListQuery {
            search: None,
            page: Some(1),
            limit: Some(20),
        };
        let outcomes = fetch_all(self.backend.as_ref(), &Collection::FEED, &query).await;

        let mut items: Vec<MediaItem> = Vec::new();
        let mut all_failed = true;
        let mut first_error = String::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(raws) => {
                    all_failed = false;
                    items.extend(normalize_all(&raws, outcome.collection));
                }
                Err(e) => {
                    if first_error.is_empty() {
                        first_error = e;
                    }
                }
            }
        }
        if all_failed {
            return Err(AggregateError::TotalFetchFailure {
                attempted: Collection::FEED.len(),
                first_error,
            });
        }
        Ok(browse::latest(&dedupe_last_wins(items), limit))
    }

    /// Fetch and normalize a single item by collection and slug.
    pub async fn detail(&self, collection: Collection, slug: &str) -> Result<MediaItem> {
        let raw = self.backend.fetch_detail(collection, slug).await?;
        normalize(&raw, collection)
            .ok_or_else(|| anyhow::anyhow!("item {collection}/{slug} has no usable title"))
    }

    /// Persist the last-used browse selection across sessions.
    pub async fn save_filters(&self, opts: &BrowseOptions) -> Result<()> {
        let payload = serde_json::to_string(opts).context("serializing filters")?;
        // Filters never expire on their own; they are replaced or cleared.
        self.store.put_cache(FILTERS_KEY, &payload, i64::MAX).await
    }

    pub async fn load_filters(&self) -> Result<Option<BrowseOptions>> {
        let payload = self.store.get_cache(FILTERS_KEY, current_epoch()).await?;
        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }

    /// Drop cache entries (all of them, or those under a key prefix).
    /// Returns the number removed. The next cycle refetches.
    pub async fn clear_cache(&self, prefix: Option<&str>) -> Result<u64> {
        self.store.clear_cache_prefix(prefix).await
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        let (entries, expired_entries) = self.store.cache_counts(current_epoch()).await?;
        Ok(CacheStats {
            entries,
            expired_entries,
        })
    }

    // --- helpers ---

    async fn read_cached_items(&self, key: &str, now: i64) -> Option<Vec<MediaItem>> {
        let payload = self.store.get_cache(key, now).await.ok().flatten()?;
        // An unreadable payload (format drift) counts as a miss.
        serde_json::from_str::<Vec<MediaItem>>(&payload).ok()
    }

    /// Write the combined entry plus one entry per succeeded collection, so
    /// a later collection-scoped lookup can reuse this cycle.
    async fn write_back(
        &self,
        norm: &str,
        items: &[MediaItem],
        succeeded: &[Collection],
        now: i64,
    ) -> Result<()> {
        let expires_at = now + self.config.search_ttl_secs;
        let payload = serde_json::to_string(items).context("serializing cache payload")?;
        self.store
            .put_cache(&cache_key("all", norm), &payload, expires_at)
            .await?;

        for &collection in succeeded {
            let subset: Vec<&MediaItem> =
                items.iter().filter(|i| i.collection == collection).collect();
            let payload = serde_json::to_string(&subset).context("serializing cache payload")?;
            self.store
                .put_cache(&cache_key(collection.as_str(), norm), &payload, expires_at)
                .await?;
        }
        Ok(())
    }
}

/// `courses:<collection|all>:<normalized query|all>`
fn cache_key(scope: &str, norm_query: &str) -> String {
    let query = if norm_query.is_empty() { "all" } else { norm_query };
    format!("courses:{}:{}", scope, query)
}

/// Collapse duplicate `(collection, slug)` pairs, keeping the most recently
/// seen instance in the earlier instance's position. Input order is the
/// fixed collection order, never network arrival order.
fn dedupe_last_wins(items: Vec<MediaItem>) -> Vec<MediaItem> {
    let mut index: HashMap<(Collection, String), usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<MediaItem> = Vec::with_capacity(items.len());
    for item in items {
        match index.entry((item.collection, item.slug.clone())) {
            std::collections::hash_map::Entry::Occupied(e) => out[*e.get()] = item,
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(out.len());
                out.push(item);
            }
        }
    }
    out
}

fn norm_query(q: &str) -> String {
    let t = q.trim().to_ascii_lowercase();
    let mut o = String::with_capacity(t.len());
    let mut s = false;
    for c in t.chars() {
        if c.is_whitespace() {
            if !s {
                o.push(' ');
                s = true;
            }
        } else {
            o.push(c);
            s = false;
        }
    }
    o
}

fn current_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RawItem;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Backend double: per-collection scripted responses, total call count,
    /// optional per-call delay.
    struct FakeBackend {
        responses: Mutex<HashMap<Collection, Result<Vec<RawItem>, String>>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<Collection>>,
        delay: Option<Duration>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn ok(self, collection: Collection, items: Vec<serde_json::Value>) -> Self {
            let raws = items
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap())
                .collect();
            self.responses
                .lock()
                .unwrap()
                .insert(collection, Ok(raws));
            self
        }

        fn fail(self, collection: Collection, msg: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(collection, Err(msg.to_string()));
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn collections_seen(&self) -> Vec<Collection> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CollectionBackend for FakeBackend {
        async fn fetch_list(
            &self,
            collection: Collection,
            _query: &ListQuery,
        ) -> anyhow::Result<Vec<RawItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(collection);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            match self.responses.lock().unwrap().get(&collection) {
                Some(Ok(items)) => Ok(items.clone()),
                Some(Err(e)) => anyhow::bail!("{e}"),
                None => Ok(Vec::new()),
            }
        }

        async fn fetch_detail(
            &self,
            _collection: Collection,
            slug: &str,
        ) -> anyhow::Result<RawItem> {
            Ok(serde_json::from_value(json!({ "title": "Detail", "slug": slug })).unwrap())
        }
    }

    fn pipeline(backend: FakeBackend) -> (Multiverse, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let mv = Multiverse::with_parts(
            backend.clone(),
            Arc::new(MemoryStore::new()),
            Config::default(),
        );
        (mv, backend)
    }

    #[tokio::test]
    async fn partial_failures_keep_succeeding_collections() {
        let backend = FakeBackend::new()
            .ok(Collection::Movies, vec![json!({"title": "Dune"})])
            .ok(Collection::WebSeries, vec![json!({"title": "Dark"})])
            .fail(Collection::AnimeSeries, "timeout");
        let (mv, _) = pipeline(backend);

        let outcome = mv.search("d").await.unwrap();
        let titles: Vec<&str> = outcome.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Dune", "Dark"]);
        assert_eq!(outcome.partial_failures.len(), 1);
        assert_eq!(outcome.partial_failures[0].0, Collection::AnimeSeries);
        assert!(!outcome.from_cache);
    }

    #[tokio::test]
    async fn total_failure_is_an_error_and_leaves_cache_alone() {
        let mut backend = FakeBackend::new();
        for c in Collection::SEARCHED {
            backend = backend.fail(c, "connection refused");
        }
        let backend = Arc::new(backend);
        let store = Arc::new(MemoryStore::new());
        // Pre-existing entry for the same key must survive the failed cycle.
        let key = cache_key("all", "dune");
        store.put_cache(&key, "[\"sentinel\"]", i64::MAX).await.unwrap();

        let mv = Multiverse::with_parts(backend, store.clone(), Config::default());
        let err = mv.search_with_refresh("dune", true).await.unwrap_err();
        assert!(matches!(err, AggregateError::TotalFetchFailure { attempted: 10, .. }));
        assert_eq!(
            store.get_cache(&key, 0).await.unwrap().as_deref(),
            Some("[\"sentinel\"]")
        );
    }

    #[tokio::test]
    async fn empty_results_are_success_not_failure() {
        // Every collection answers, none match.
        let (mv, _) = pipeline(FakeBackend::new());
        let outcome = mv.search("zzz").await.unwrap();
        assert!(outcome.items.is_empty());
        assert!(outcome.partial_failures.is_empty());
    }

    #[tokio::test]
    async fn fresh_cache_serves_without_network_calls() {
        let backend = FakeBackend::new().ok(Collection::Movies, vec![json!({"title": "Dune"})]);
        let (mv, backend) = pipeline(backend);

        let first = mv.search("dune").await.unwrap();
        assert!(!first.from_cache);
        let calls_after_first = backend.call_count();
        assert_eq!(calls_after_first, Collection::SEARCHED.len());

        let second = mv.search("dune").await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.items, first.items);
        assert_eq!(backend.call_count(), calls_after_first);
    }

    #[tokio::test]
    async fn expired_cache_triggers_full_refetch() {
        let backend = FakeBackend::new().ok(Collection::Movies, vec![json!({"title": "Dune"})]);
        let backend = Arc::new(backend);
        let config = Config {
            search_ttl_secs: 0, // expires immediately
            ..Config::default()
        };
        let mv = Multiverse::with_parts(backend.clone(), Arc::new(MemoryStore::new()), config);

        mv.search("dune").await.unwrap();
        let second = mv.search("dune").await.unwrap();
        assert!(!second.from_cache);
        assert_eq!(backend.call_count(), 2 * Collection::SEARCHED.len());
    }

    #[tokio::test]
    async fn query_normalization_shares_cache_entries() {
        let backend = FakeBackend::new().ok(Collection::Movies, vec![json!({"title": "Dune"})]);
        let (mv, backend) = pipeline(backend);

        mv.search("  Dune   Part  ").await.unwrap();
        let cached = mv.search("dune part").await.unwrap();
        assert!(cached.from_cache);
        assert_eq!(backend.call_count(), Collection::SEARCHED.len());
    }

    #[tokio::test]
    async fn duplicate_collection_slug_pairs_collapse_last_wins() {
        let backend = FakeBackend::new().ok(
            Collection::Movies,
            vec![
                json!({"title": "Dune", "slug": "dune", "rating": 7.0}),
                json!({"title": "Dune", "slug": "dune", "rating": 9.0}),
            ],
        );
        let (mv, _) = pipeline(backend);

        let outcome = mv.search("dune").await.unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].rating, Some(9.0));
    }

    #[tokio::test]
    async fn same_slug_in_different_collections_is_not_a_duplicate() {
        let backend = FakeBackend::new()
            .ok(Collection::Movies, vec![json!({"title": "Dune", "slug": "dune"})])
            .ok(Collection::PcGames, vec![json!({"title": "Dune", "slug": "dune"})]);
        let (mv, _) = pipeline(backend);
        let outcome = mv.search("dune").await.unwrap();
        assert_eq!(outcome.items.len(), 2);
    }

    #[tokio::test]
    async fn per_collection_entries_serve_scoped_lookups() {
        let backend = FakeBackend::new()
            .ok(Collection::Movies, vec![json!({"title": "Dune", "slug": "dune"})])
            .ok(Collection::PcGames, vec![json!({"title": "Dune II", "slug": "dune-2"})]);
        let (mv, backend) = pipeline(backend);

        mv.search("dune").await.unwrap();
        let calls = backend.call_count();

        let movies = mv.collection_items(Collection::Movies, "dune").await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].collection, Collection::Movies);
        // Served from the write-back of the combined cycle.
        assert_eq!(backend.call_count(), calls);
    }

    #[tokio::test]
    async fn combined_search_skips_drama_collections() {
        let backend = FakeBackend::new().ok(Collection::Movies, vec![json!({"title": "Dune"})]);
        let (mv, backend) = pipeline(backend);

        mv.search("dune").await.unwrap();
        let seen = backend.collections_seen();
        assert_eq!(seen.len(), Collection::SEARCHED.len());
        assert!(seen.iter().all(|c| !c.in_group(crate::collections::CategoryGroup::Drama)));
    }

    #[tokio::test]
    async fn drama_collections_are_listable_when_uncached() {
        let backend = FakeBackend::new().ok(
            Collection::KDramas,
            vec![json!({"title": "Signal", "slug": "signal"})],
        );
        let (mv, backend) = pipeline(backend);

        let items = mv.collection_items(Collection::KDramas, "signal").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].collection, Collection::KDramas);
        assert_eq!(backend.collections_seen(), [Collection::KDramas]);

        // Second lookup hits the entry written by the first.
        mv.collection_items(Collection::KDramas, "signal").await.unwrap();
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn quick_search_caps_combined_results() {
        let many: Vec<serde_json::Value> = (0..6)
            .map(|i| json!({"title": format!("M{i}"), "slug": format!("m{i}")}))
            .collect();
        let backend = FakeBackend::new()
            .ok(Collection::Movies, many.clone())
            .ok(Collection::WebSeries, many);
        let (mv, _) = pipeline(backend);

        let items = mv.quick_search("m").await.unwrap();
        assert_eq!(items.len(), 8);
    }

    #[tokio::test]
    async fn latest_updates_orders_by_freshness() {
        let backend = FakeBackend::new()
            .ok(
                Collection::Movies,
                vec![json!({"title": "Old", "updatedAt": "2023-01-01T00:00:00Z"})],
            )
            .ok(
                Collection::AnimeSeries,
                vec![json!({"title": "New", "updatedAt": "2024-01-01T00:00:00Z"})],
            );
        let (mv, _) = pipeline(backend);

        let feed = mv.latest_updates(12).await.unwrap();
        let titles: Vec<&str> = feed.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["New", "Old"]);
    }

    #[tokio::test]
    async fn detail_normalizes_single_item() {
        let (mv, _) = pipeline(FakeBackend::new());
        let item = mv.detail(Collection::Movies, "dune").await.unwrap();
        assert_eq!(item.slug, "dune");
        assert_eq!(item.collection, Collection::Movies);
    }

    #[tokio::test]
    async fn filters_round_trip_through_storage() {
        let (mv, _) = pipeline(FakeBackend::new());
        assert!(mv.load_filters().await.unwrap().is_none());

        let opts = BrowseOptions {
            min_rating: 7.0,
            sort: crate::browse::SortKey::Rating,
            ..Default::default()
        };
        mv.save_filters(&opts).await.unwrap();
        assert_eq!(mv.load_filters().await.unwrap(), Some(opts));
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let backend = FakeBackend::new().ok(Collection::Movies, vec![json!({"title": "Dune"})]);
        let (mv, backend) = pipeline(backend);

        mv.search("dune").await.unwrap();
        mv.clear_cache(Some("courses:")).await.unwrap();
        let again = mv.search("dune").await.unwrap();
        assert!(!again.from_cache);
        assert_eq!(backend.call_count(), 2 * Collection::SEARCHED.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_cycle_resolving_after_newer_query_is_flagged_superseded() {
        let mut slow = FakeBackend::new().ok(Collection::Movies, vec![json!({"title": "Slow"})]);
        slow.delay = Some(Duration::from_millis(200));
        let backend = Arc::new(slow);
        let store = Arc::new(MemoryStore::new());
        let mv = Arc::new(Multiverse::with_parts(
            backend,
            store,
            Config::default(),
        ));

        let mv_slow = mv.clone();
        let slow_handle =
            tokio::spawn(async move { mv_slow.search_with_refresh("first", true).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Newer query starts (and finishes) while the first is in flight.
        let newer = mv.search_with_refresh("second", true).await;

        let old = slow_handle.await.unwrap().unwrap();
        assert!(old.superseded);
        // The newer cycle may or may not finish last; it must never be
        // flagged by the older one.
        if let Ok(outcome) = newer {
            assert!(!outcome.superseded || outcome.from_cache);
        }
    }
}
