pub mod config;
pub mod dedup;
pub mod enrichment;
pub mod fetcher;
pub mod ids;
pub mod llm_adapter;
pub mod parser;
pub mod retention;
pub mod sources;
pub mod stores;
pub mod summary;
pub mod traits;
pub mod types;
pub mod updater;

pub use config::{ConfigReport, UpdaterConfig};
pub use dedup::DedupIndex;
pub use enrichment::{Enricher, Enrichment, EnrichmentOutcome};
pub use fetcher::Fetcher;
pub use ids::derive_id;
pub use llm_adapter::{GroqAdapter, MockLlmAdapter};
pub use parser::FeedParser;
pub use sources::{RssFeedSource, StaticFeedSource};
pub use stores::{MemoryArticleStore, PgArticleStore};
pub use summary::RunSummary;
pub use traits::{ArticleStore, FeedSource, LlmAdapter};
pub use types::*;
pub use updater::{ArticleUpdater, RunPhase, UpdateSettings};
