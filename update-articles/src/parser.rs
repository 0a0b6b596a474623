use crate::types::{FeedItem, Result, UpdaterError};
use chrono::Utc;
use feed_rs::parser;
use tracing::{debug, info};

pub struct FeedParser;

impl FeedParser {
    /// Parses an RSS or Atom document into feed items, in document order.
    /// Entries without a title or link keep empty strings.
    pub fn parse_items(content: &str) -> Result<Vec<FeedItem>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| UpdaterError::FeedParse(format!("Failed to parse feed: {}", e)))?;

        let items: Vec<FeedItem> = feed.entries.into_iter().map(Self::parse_entry).collect();

        info!("Parsed feed with {} entries", items.len());
        Ok(items)
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> FeedItem {
        let title = entry.title.map(|t| t.content.trim().to_string()).unwrap_or_default();
        let link = entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default();

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        FeedItem {
            title,
            link,
            published_at,
            description,
        }
    }
}
