use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStats {
    pub total_items: usize,
    pub recent_items: usize,
    pub excluded_old_items: usize,
    pub processed_items: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStats {
    pub new_articles: usize,
    pub skipped_existing: usize,
    pub deleted_old_articles: usize,
    pub stored_before_run: usize,
    pub retained_before_run: usize,
    pub total_stored_articles: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub operations: usize,
    pub successful_writes: usize,
    pub failed_writes: usize,
    pub failed_deletes: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStats {
    pub calls: usize,
    pub successful: usize,
    pub fallbacks: usize,
    pub average_time_ms: u64,
    #[serde(skip)]
    total_time: Duration,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInfo {
    pub retention_days: u32,
    pub limit_count: usize,
    pub feed_url: String,
}

/// Outcome of one update run, accumulated while the run progresses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub success: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub processing_time_ms: u64,
    pub feed_stats: FeedStats,
    pub article_stats: ArticleStats,
    pub store_stats: StoreStats,
    pub enrichment_stats: EnrichmentStats,
    pub config_info: ConfigInfo,
    pub error_details: Vec<String>,
}

impl RunSummary {
    pub fn start(start_time: DateTime<Utc>, config_info: ConfigInfo) -> Self {
        Self {
            success: false,
            start_time,
            end_time: None,
            processing_time_ms: 0,
            feed_stats: FeedStats::default(),
            article_stats: ArticleStats::default(),
            store_stats: StoreStats::default(),
            enrichment_stats: EnrichmentStats::default(),
            config_info,
            error_details: Vec::new(),
        }
    }

    pub fn record_enrichment(&mut self, translated: bool, elapsed: Duration) {
        let stats = &mut self.enrichment_stats;
        stats.calls += 1;
        if translated {
            stats.successful += 1;
        } else {
            stats.fallbacks += 1;
        }
        stats.total_time += elapsed;
        stats.average_time_ms = (stats.total_time.as_millis() / stats.calls as u128) as u64;
    }

    pub fn record_write(&mut self, result: Result<(), String>) {
        self.store_stats.operations += 1;
        match result {
            Ok(()) => {
                self.store_stats.successful_writes += 1;
                self.article_stats.new_articles += 1;
            }
            Err(detail) => {
                self.store_stats.failed_writes += 1;
                self.error_details.push(detail);
            }
        }
    }

    pub fn record_delete(&mut self, result: Result<(), String>) {
        self.store_stats.operations += 1;
        match result {
            Ok(()) => self.article_stats.deleted_old_articles += 1,
            Err(detail) => {
                self.store_stats.failed_deletes += 1;
                self.error_details.push(detail);
            }
        }
    }

    pub fn record_error(&mut self, detail: impl Into<String>) {
        self.error_details.push(detail.into());
    }

    pub fn finish(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
        self.processing_time_ms = (end_time - self.start_time).num_milliseconds().max(0) as u64;
        self.success = true;
    }
}
