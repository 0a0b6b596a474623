use crate::traits::ArticleStore;
use crate::types::{Article, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

/// Article store backed by a single PostgreSQL `articles` table.
pub struct PgArticleStore {
    db: PgPool,
}

impl PgArticleStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(db))
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    /// Applies the bundled migrations.
    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        info!("Article schema is up to date");
        Ok(())
    }

    fn article_from_row(row: &PgRow) -> Result<Article> {
        let tags_json: serde_json::Value = row.try_get("tags")?;
        let links_json: serde_json::Value = row.try_get("extracted_links")?;

        Ok(Article {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            link: row.try_get("link")?,
            description: row.try_get("description")?,
            translated_title: row.try_get("translated_title")?,
            translated_description: row.try_get("translated_description")?,
            tags: serde_json::from_value(tags_json)?,
            extracted_links: serde_json::from_value(links_json)?,
            published_at: row.try_get::<DateTime<Utc>, _>("published_at")?,
        })
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn query_all(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT * FROM articles ORDER BY published_at DESC")
            .fetch_all(&self.db)
            .await?;

        let articles = rows
            .iter()
            .map(Self::article_from_row)
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} stored articles", articles.len());
        Ok(articles)
    }

    async fn upsert(&self, article: &Article) -> Result<()> {
        // published_at is never updated on conflict.
        sqlx::query(
            r#"
            INSERT INTO articles (id, title, link, description, translated_title, translated_description,
                                  tags, extracted_links, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                link = EXCLUDED.link,
                description = EXCLUDED.description,
                translated_title = EXCLUDED.translated_title,
                translated_description = EXCLUDED.translated_description,
                tags = EXCLUDED.tags,
                extracted_links = EXCLUDED.extracted_links,
                updated_at = NOW()
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.description)
        .bind(&article.translated_title)
        .bind(&article.translated_description)
        .bind(serde_json::to_value(&article.tags)?)
        .bind(serde_json::to_value(&article.extracted_links)?)
        .bind(article.published_at)
        .execute(&self.db)
        .await?;

        debug!("Upserted article {}", article.id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn query_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT * FROM articles WHERE published_at < $1 ORDER BY published_at DESC")
            .bind(cutoff)
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(Self::article_from_row).collect()
    }
}
