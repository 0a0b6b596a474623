use crate::traits::ArticleStore;
use crate::types::{Article, Result, UpdaterError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process article store. Used by tests and local dry runs.
#[derive(Clone, Default)]
pub struct MemoryArticleStore {
    articles: Arc<RwLock<HashMap<String, Article>>>,
    failing_writes: Arc<RwLock<HashSet<String>>>,
    failing_deletes: Arc<RwLock<HashSet<String>>>,
    fail_queries: Arc<RwLock<bool>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.articles.write().await;
            for article in articles {
                guard.insert(article.id.clone(), article);
            }
        }
        store
    }

    /// Makes every `upsert` of `id` fail
    pub async fn fail_writes_for(&self, id: impl Into<String>) {
        self.failing_writes.write().await.insert(id.into());
    }

    /// Makes every `delete` of `id` fail
    pub async fn fail_deletes_for(&self, id: impl Into<String>) {
        self.failing_deletes.write().await.insert(id.into());
    }

    pub async fn fail_queries(&self, fail: bool) {
        *self.fail_queries.write().await = fail;
    }

    pub async fn get(&self, id: &str) -> Option<Article> {
        self.articles.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.articles.read().await.is_empty()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn query_all(&self) -> Result<Vec<Article>> {
        if *self.fail_queries.read().await {
            return Err(UpdaterError::Store("query failed".to_string()));
        }

        let mut articles: Vec<Article> = self.articles.read().await.values().cloned().collect();
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at).then_with(|| a.id.cmp(&b.id)));
        Ok(articles)
    }

    async fn upsert(&self, article: &Article) -> Result<()> {
        if self.failing_writes.read().await.contains(&article.id) {
            return Err(UpdaterError::Store(format!("write rejected for {}", article.id)));
        }

        let mut articles = self.articles.write().await;
        let mut stored = article.clone();
        if let Some(existing) = articles.get(&article.id) {
            stored.published_at = existing.published_at;
        }
        articles.insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.failing_deletes.read().await.contains(id) {
            return Err(UpdaterError::Store(format!("delete rejected for {}", id)));
        }

        self.articles.write().await.remove(id);
        Ok(())
    }
}
