use crate::config::{UpdaterConfig, DEFAULT_ENRICHMENT_DELAY_SECS, DEFAULT_RETENTION_DAYS};
use crate::dedup::DedupIndex;
use crate::enrichment::Enricher;
use crate::ids::derive_id;
use crate::retention;
use crate::summary::{ConfigInfo, RunSummary};
use crate::traits::{ArticleStore, FeedSource};
use crate::types::{Article, FeedItem, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Phases of a run, in the order they execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Fetching,
    Filtering,
    Limiting,
    Reconciling,
    Sweeping,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetching => "fetching",
            Self::Filtering => "filtering",
            Self::Limiting => "limiting",
            Self::Reconciling => "reconciling",
            Self::Sweeping => "sweeping",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateSettings {
    pub retention_days: u32,
    /// Pause between consecutive enrichment calls
    pub enrichment_delay: Duration,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            enrichment_delay: Duration::from_secs(DEFAULT_ENRICHMENT_DELAY_SECS),
        }
    }
}

impl From<&UpdaterConfig> for UpdateSettings {
    fn from(config: &UpdaterConfig) -> Self {
        Self {
            retention_days: config.retention_days,
            enrichment_delay: config.enrichment_delay,
        }
    }
}

/// Reconciles the feed against the article store.
///
/// Items are handled one at a time. Per-item enrichment and store failures
/// are recorded in the [`RunSummary`] and never abort the run; only a failed
/// feed fetch is returned as an error.
pub struct ArticleUpdater {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn ArticleStore>,
    enricher: Enricher,
    settings: UpdateSettings,
    span: Span,
}

impl ArticleUpdater {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn ArticleStore>,
        enricher: Enricher,
        settings: UpdateSettings,
    ) -> Self {
        let span = tracing::info_span!("article_update", feed = %source.location());
        Self {
            source,
            store,
            enricher,
            settings,
            span,
        }
    }

    /// Runs every log line of this updater inside `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn settings(&self) -> &UpdateSettings {
        &self.settings
    }

    /// One full update. `limit == 0` processes every retained item.
    pub async fn run_update(&self, limit: usize) -> Result<RunSummary> {
        self.run_update_at(limit, Utc::now()).await
    }

    /// Same as [`run_update`](Self::run_update) with an explicit "now".
    pub async fn run_update_at(&self, limit: usize, now: DateTime<Utc>) -> Result<RunSummary> {
        self.execute(limit, now).instrument(self.span.clone()).await
    }

    async fn execute(&self, limit: usize, now: DateTime<Utc>) -> Result<RunSummary> {
        let location = self.source.location();
        let mut summary = RunSummary::start(
            now,
            ConfigInfo {
                retention_days: self.settings.retention_days,
                limit_count: limit,
                feed_url: location.clone(),
            },
        );

        info!(phase = %RunPhase::Fetching, "Fetching feed {}", location);
        let items = self.source.fetch_items().await.map_err(|e| {
            error!(phase = %RunPhase::Fetching, kind = ?e.kind(), fatal = e.is_fatal(), "Feed fetch failed: {}", e);
            e
        })?;
        summary.feed_stats.total_items = items.len();

        if items.is_empty() {
            info!("Feed returned no items, skipping reconciliation");
        } else {
            let limited = self.select_items(items, limit, now, &mut summary);
            if limited.is_empty() {
                info!("No items within the last {} days", self.settings.retention_days);
            } else {
                self.reconcile(&limited, now, &mut summary).await;
            }
        }

        self.sweep(now, &mut summary).await;

        match self.store.query_all().await {
            Ok(articles) => summary.article_stats.total_stored_articles = articles.len(),
            Err(e) => {
                warn!("Could not count stored articles: {}", e);
                summary.record_error(format!("Failed to count stored articles: {}", e));
            }
        }

        summary.finish(Utc::now());
        info!(
            phase = %RunPhase::Done,
            "Run finished in {}ms: {} new, {} skipped, {} deleted, {} errors",
            summary.processing_time_ms,
            summary.article_stats.new_articles,
            summary.article_stats.skipped_existing,
            summary.article_stats.deleted_old_articles,
            summary.error_details.len()
        );
        Ok(summary)
    }

    fn select_items(
        &self,
        items: Vec<FeedItem>,
        limit: usize,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Vec<FeedItem> {
        let total = items.len();
        let recent = retention::filter_recent(items, now, self.settings.retention_days);
        summary.feed_stats.recent_items = recent.len();
        summary.feed_stats.excluded_old_items = total - recent.len();
        info!(
            phase = %RunPhase::Filtering,
            "{} of {} items are within {} days",
            recent.len(),
            total,
            self.settings.retention_days
        );

        let limit_count = if limit == 0 { usize::MAX } else { limit };
        let limited: Vec<FeedItem> = recent.into_iter().take(limit_count).collect();
        summary.feed_stats.processed_items = limited.len();
        debug!(phase = %RunPhase::Limiting, "Processing {} items (limit {})", limited.len(), limit);

        limited
    }

    async fn reconcile(&self, items: &[FeedItem], now: DateTime<Utc>, summary: &mut RunSummary) {
        let snapshot = match self.store.query_all().await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(phase = %RunPhase::Reconciling, "Failed to load stored articles, continuing with none: {}", e);
                summary.record_error(format!("Failed to load stored articles: {}", e));
                Vec::new()
            }
        };
        summary.article_stats.stored_before_run = snapshot.len();

        let retained = retention::filter_recent(snapshot, now, self.settings.retention_days);
        summary.article_stats.retained_before_run = retained.len();
        let mut index = DedupIndex::from_articles(&retained);
        info!(
            phase = %RunPhase::Reconciling,
            "Reconciling {} items against {} stored articles",
            items.len(),
            retained.len()
        );

        let mut enriched_any = false;
        for (position, item) in items.iter().enumerate() {
            if index.is_duplicate(item) {
                summary.article_stats.skipped_existing += 1;
                debug!("Skipping existing article: {} ({})", item.title, item.link);
                continue;
            }

            if enriched_any && !self.settings.enrichment_delay.is_zero() {
                tokio::time::sleep(self.settings.enrichment_delay).await;
            }

            info!("[{}/{}] Enriching: {}", position + 1, items.len(), item.title);
            let enrichment = self.enricher.enrich(&item.title, &item.description).await;
            summary.record_enrichment(enrichment.is_translated(), enrichment.elapsed);
            enriched_any = true;

            let article = Article::from_item(derive_id(&item.link), item, enrichment.record, now);
            match self.store.upsert(&article).await {
                Ok(()) => {
                    index.insert(&article.link, &article.title);
                    summary.record_write(Ok(()));
                    debug!("Stored article {}", article.id);
                }
                Err(e) => {
                    warn!("Failed to store article {}: {}", article.id, e);
                    summary.record_write(Err(format!("Failed to store article {} ({}): {}", article.id, article.link, e)));
                }
            }
        }
    }

    async fn sweep(&self, now: DateTime<Utc>, summary: &mut RunSummary) {
        let cutoff = retention::cutoff(now, self.settings.retention_days);
        let expired = match self.store.query_older_than(cutoff).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(phase = %RunPhase::Sweeping, "Failed to query expired articles: {}", e);
                summary.record_error(format!("Failed to query expired articles: {}", e));
                return;
            }
        };

        if expired.is_empty() {
            debug!(phase = %RunPhase::Sweeping, "No articles older than {}", cutoff);
            return;
        }

        info!(phase = %RunPhase::Sweeping, "Deleting {} articles older than {}", expired.len(), cutoff);
        for article in expired {
            match self.store.delete(&article.id).await {
                Ok(()) => {
                    debug!("Deleted expired article {}", article.id);
                    summary.record_delete(Ok(()));
                }
                Err(e) => {
                    warn!("Failed to delete article {}: {}", article.id, e);
                    summary.record_delete(Err(format!("Failed to delete article {}: {}", article.id, e)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_adapter::MockLlmAdapter;
    use crate::sources::StaticFeedSource;
    use crate::stores::MemoryArticleStore;
    use chrono::Duration as ChronoDuration;

    fn updater(items: Vec<FeedItem>, store: MemoryArticleStore, llm: Arc<MockLlmAdapter>) -> ArticleUpdater {
        ArticleUpdater::new(
            Arc::new(StaticFeedSource::new(items)),
            Arc::new(store),
            Enricher::new(llm, "Azure"),
            UpdateSettings {
                retention_days: 30,
                enrichment_delay: Duration::ZERO,
            },
        )
    }

    fn item(n: usize, now: DateTime<Utc>) -> FeedItem {
        FeedItem::new(format!("Update {n}"), format!("https://azure.microsoft.com/updates/{n}"))
            .published(now - ChronoDuration::hours(n as i64))
    }

    #[tokio::test]
    async fn limit_truncates_in_feed_order() {
        let now = Utc::now();
        let items: Vec<FeedItem> = (0..8).map(|n| item(n, now)).collect();
        let store = MemoryArticleStore::new();
        let llm = Arc::new(MockLlmAdapter::new("limit"));

        let summary = updater(items, store.clone(), llm.clone()).run_update_at(5, now).await.unwrap();

        assert_eq!(summary.feed_stats.processed_items, 5);
        assert_eq!(summary.article_stats.new_articles, 5);
        assert_eq!(llm.call_count(), 5);
        assert!(store.get(&derive_id("https://azure.microsoft.com/updates/4")).await.is_some());
        assert!(store.get(&derive_id("https://azure.microsoft.com/updates/5")).await.is_none());
    }

    #[tokio::test]
    async fn zero_limit_is_unbounded() {
        let now = Utc::now();
        let items: Vec<FeedItem> = (0..12).map(|n| item(n, now)).collect();
        let llm = Arc::new(MockLlmAdapter::new("unbounded"));

        let summary = updater(items, MemoryArticleStore::new(), llm)
            .run_update_at(0, now)
            .await
            .unwrap();

        assert_eq!(summary.feed_stats.processed_items, 12);
        assert_eq!(summary.article_stats.new_articles, 12);
        assert_eq!(summary.config_info.limit_count, 0);
    }

    fn delayed(items: Vec<FeedItem>, store: MemoryArticleStore, delay: Duration) -> ArticleUpdater {
        let mut updater = updater(items, store, Arc::new(MockLlmAdapter::new("delay")));
        updater.settings.enrichment_delay = delay;
        updater
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies_between_enrichments_only() {
        let now = Utc::now();
        let items: Vec<FeedItem> = (0..3).map(|n| item(n, now)).collect();
        let updater = delayed(items, MemoryArticleStore::new(), Duration::from_millis(50));
        assert_eq!(updater.settings().enrichment_delay, Duration::from_millis(50));

        let started = tokio::time::Instant::now();
        let summary = updater.run_update_at(10, now).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(summary.article_stats.new_articles, 3);
        assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(150), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn skipped_items_do_not_add_a_delay() {
        let now = Utc::now();
        let known = item(1, now);
        let store = MemoryArticleStore::with_articles(vec![Article::from_item(
            derive_id(&known.link),
            &known,
            crate::types::EnrichmentRecord::fallback(&known.title, "", "Azure"),
            now,
        )])
        .await;
        let items = vec![item(0, now), known, item(2, now)];
        let updater = delayed(items, store, Duration::from_millis(50));

        let started = tokio::time::Instant::now();
        let summary = updater.run_update_at(10, now).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(summary.article_stats.new_articles, 2);
        assert_eq!(summary.article_stats.skipped_existing, 1);
        assert!(elapsed >= Duration::from_millis(50), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn trailing_duplicate_does_not_add_a_delay() {
        let now = Utc::now();
        let mut repeat = item(1, now);
        repeat.title = "Update 1 (repost)".to_string();
        let items = vec![item(0, now), item(1, now), repeat];
        let updater = delayed(items, MemoryArticleStore::new(), Duration::from_millis(50));

        let started = tokio::time::Instant::now();
        let summary = updater.run_update_at(10, now).await.unwrap();

        assert_eq!(summary.article_stats.new_articles, 2);
        assert_eq!(summary.article_stats.skipped_existing, 1);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(100), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn oversized_retention_keeps_everything_without_panicking() {
        let now = Utc::now();
        let items = vec![FeedItem::new("Old", "https://azure.microsoft.com/updates/old")
            .published(now - ChronoDuration::days(20_000))];
        let mut updater = updater(items, MemoryArticleStore::new(), Arc::new(MockLlmAdapter::new("retention")));
        updater.settings.retention_days = 4_000_000_000;

        let summary = updater.run_update_at(10, now).await.unwrap();

        assert_eq!(summary.feed_stats.excluded_old_items, 0);
        assert_eq!(summary.article_stats.new_articles, 1);
        assert_eq!(summary.article_stats.deleted_old_articles, 0);
    }

    #[test]
    fn phase_names_are_lowercase() {
        assert_eq!(RunPhase::Reconciling.to_string(), "reconciling");
        assert_eq!(RunPhase::Done.to_string(), "done");
    }
}
