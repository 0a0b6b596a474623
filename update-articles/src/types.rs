use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the upstream feed, normalized to the fields the pipeline reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub description: String,
}

impl FeedItem {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_at: None,
            description: String::new(),
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A feed item after enrichment, as persisted in the article store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub translated_title: String,
    pub translated_description: String,
    pub tags: Vec<String>,
    pub extracted_links: Vec<String>,
    pub published_at: DateTime<Utc>,
}

impl Article {
    pub fn from_item(
        id: String,
        item: &FeedItem,
        enrichment: EnrichmentRecord,
        fallback_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: item.title.clone(),
            link: item.link.clone(),
            description: item.description.clone(),
            translated_title: enrichment.translated_title,
            translated_description: enrichment.translated_description,
            tags: enrichment.tags,
            extracted_links: enrichment.extracted_links,
            published_at: item.published_at.unwrap_or(fallback_date),
        }
    }
}

/// Output of the enrichment step for a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRecord {
    pub translated_title: String,
    pub translated_description: String,
    pub tags: Vec<String>,
    pub extracted_links: Vec<String>,
}

impl EnrichmentRecord {
    /// Record used whenever the language model cannot be used for an item.
    pub fn fallback(title: &str, content: &str, generic_tag: &str) -> Self {
        Self {
            translated_title: title.to_string(),
            translated_description: content.to_string(),
            tags: vec![generic_tag.to_string()],
            extracted_links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Azure News Digest Bot 1.0".to_string(),
            accept: "application/rss+xml, application/xml, text/xml".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// Coarse category of an [`UpdaterError`], fixed by the boundary that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Configuration,
    Transport,
    Parse,
    Enrichment,
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdaterError {
    #[error("Missing required configuration: {}", missing.join(", "))]
    MissingConfig { missing: Vec<String> },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed request failed with HTTP {status}")]
    FeedStatus { status: u16 },

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Language model request failed: {0}")]
    Llm(String),

    #[error("Invalid language model response: {0}")]
    InvalidResponse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl UpdaterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingConfig { .. } | Self::InvalidConfig { .. } => ErrorKind::Configuration,
            Self::Http(_) | Self::FeedStatus { .. } | Self::FeedTooLarge { .. } => {
                ErrorKind::Transport
            }
            Self::FeedParse(_) | Self::InvalidUrl(_) | Self::Serialization(_) => ErrorKind::Parse,
            Self::Llm(_) | Self::InvalidResponse(_) => ErrorKind::Enrichment,
            Self::Database(_) | Self::Migration(_) | Self::Store(_) => ErrorKind::Storage,
        }
    }

    /// Whether this error ends the run. Configuration problems and failures to
    /// fetch or parse the feed are fatal; enrichment and per-item storage
    /// failures are recorded and the run continues.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::MissingConfig { .. } | Self::InvalidConfig { .. } => true,
            Self::Http(_)
            | Self::FeedStatus { .. }
            | Self::FeedTooLarge { .. }
            | Self::FeedParse(_)
            | Self::InvalidUrl(_) => true,
            Self::Llm(_)
            | Self::InvalidResponse(_)
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Store(_)
            | Self::Serialization(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, UpdaterError>;
