use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{FeedItem, FetchConfig, Result};
use async_trait::async_trait;
use tracing::info;

/// Feed source that downloads and parses an RSS/Atom document.
pub struct RssFeedSource {
    url: String,
    fetcher: Fetcher,
}

impl RssFeedSource {
    pub fn new(url: impl Into<String>, fetch_config: FetchConfig) -> Result<Self> {
        let url = url.into();
        url::Url::parse(&url)?;

        Ok(Self {
            url,
            fetcher: Fetcher::new(fetch_config)?,
        })
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch_items(&self) -> Result<Vec<FeedItem>> {
        info!("Pulling RSS feed: {}", self.url);
        let content = self.fetcher.fetch_feed(&self.url).await?;
        FeedParser::parse_items(&content)
    }
}
