use crate::traits::FeedSource;
use crate::types::{FeedItem, Result, UpdaterError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Feed source returning a fixed set of items, or a fixed failure.
pub struct StaticFeedSource {
    items: Vec<FeedItem>,
    failure: Option<u16>,
    fetches: AtomicUsize,
}

impl StaticFeedSource {
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            failure: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source whose every fetch fails with the given HTTP status
    pub fn unreachable(status: u16) -> Self {
        Self {
            items: Vec::new(),
            failure: Some(status),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    fn location(&self) -> String {
        "static://fixture".to_string()
    }

    async fn fetch_items(&self) -> Result<Vec<FeedItem>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(status) => Err(UpdaterError::FeedStatus { status }),
            None => Ok(self.items.clone()),
        }
    }
}
