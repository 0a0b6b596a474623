use crate::types::{Article, FeedItem, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of raw feed items (RSS over HTTP, fixtures in tests, ...).
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable location of the feed, used in logs and the run summary
    fn location(&self) -> String;

    /// Fetch the current feed contents, in the feed's own order
    async fn fetch_items(&self) -> Result<Vec<FeedItem>>;
}

/// Keyed persistent store of enriched articles.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// All stored articles, newest first
    async fn query_all(&self) -> Result<Vec<Article>>;

    /// Insert or overwrite by `article.id`. An existing `published_at` is kept.
    async fn upsert(&self, article: &Article) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Articles published strictly before `cutoff`
    async fn query_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Article>> {
        let articles = self.query_all().await?;
        Ok(articles
            .into_iter()
            .filter(|article| article.published_at < cutoff)
            .collect())
    }
}

/// Text completion backend used for enrichment.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Get the name of this LLM adapter
    fn adapter_name(&self) -> String;

    /// Send a single prompt and return the raw completion text
    async fn complete(&self, prompt: &str) -> Result<String>;
}
