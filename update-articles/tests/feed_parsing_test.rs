use chrono::{Duration as ChronoDuration, Utc};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing::info;
use update_articles::{
    derive_id, ArticleUpdater, Enricher, FeedParser, FetchConfig, MemoryArticleStore,
    MockLlmAdapter, RssFeedSource, StaticFeedSource, UpdateSettings,
};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

fn azure_feed() -> String {
    let recent = (Utc::now() - ChronoDuration::days(2)).to_rfc2822();
    let stale = (Utc::now() - ChronoDuration::days(90)).to_rfc2822();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:a10="http://www.w3.org/2005/Atom">
  <channel>
    <title>Azure updates</title>
    <link>https://azure.microsoft.com/updates</link>
    <description>Latest Azure updates</description>
    <item>
      <guid isPermaLink="false">1</guid>
      <link>https://azure.microsoft.com/updates?id=480001</link>
      <title>Generally available: Azure Functions Flex Consumption</title>
      <description>Flex Consumption is now generally available. See https://aka.ms/flex for details.</description>
      <pubDate>{recent}</pubDate>
    </item>
    <item>
      <guid isPermaLink="false">2</guid>
      <link>https://azure.microsoft.com/updates/retirement-event-hubs-capture</link>
      <title>Retirement: Event Hubs legacy capture</title>
      <description>Migrate before the retirement date.</description>
      <pubDate>{stale}</pubDate>
    </item>
    <item>
      <guid isPermaLink="false">3</guid>
      <link>https://azure.microsoft.com/updates/public-preview-vm-series</link>
      <title>Public preview: new VM series</title>
      <description></description>
    </item>
  </channel>
</rss>"#
    )
}

#[test]
fn test_parse_azure_style_feed() {
    init_tracing();
    let items = FeedParser::parse_items(&azure_feed()).unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].title, "Generally available: Azure Functions Flex Consumption");
    assert_eq!(items[0].link, "https://azure.microsoft.com/updates?id=480001");
    assert!(items[0].published_at.is_some());
    assert!(items[2].published_at.is_none());
    assert_eq!(items[2].description, "");
}

#[tokio::test]
async fn test_parsed_feed_through_pipeline() {
    init_tracing();
    let items = FeedParser::parse_items(&azure_feed()).unwrap();
    let store = MemoryArticleStore::new();
    let llm = Arc::new(MockLlmAdapter::new("feed").responding(
        r#"```json
{"japaneseTitle": "一般提供: Azure Functions Flex Consumption", "japaneseDescription": "一般提供されました。", "technicalTags": ["Azure Functions"], "extractedLinks": ["https://aka.ms/flex", "https://aka.ms/flex"]}
```"#,
    ));

    let updater = ArticleUpdater::new(
        Arc::new(StaticFeedSource::new(items)),
        Arc::new(store.clone()),
        Enricher::new(llm.clone(), "Azure"),
        UpdateSettings {
            retention_days: 30,
            enrichment_delay: Duration::ZERO,
        },
    );
    let summary = updater.run_update(100).await.unwrap();
    info!("{}", serde_json::to_string_pretty(&summary).unwrap());

    assert_eq!(summary.feed_stats.total_items, 3);
    assert_eq!(summary.feed_stats.excluded_old_items, 1);
    assert_eq!(summary.article_stats.new_articles, 2);
    assert_eq!(llm.call_count(), 2);

    let ga = store
        .get(&derive_id("https://azure.microsoft.com/updates?id=480001"))
        .await
        .unwrap();
    assert_eq!(ga.tags, vec!["Azure Functions"]);
    assert_eq!(ga.extracted_links, vec!["https://aka.ms/flex"]);
    assert!(ga.id.starts_with("azure_updates_"));

    let preview_id = derive_id("https://azure.microsoft.com/updates/public-preview-vm-series");
    assert!(preview_id.starts_with("azure_public-preview-vm-se_"));
    assert!(store.get(&preview_id).await.is_some());
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_live_azure_feed() {
    init_tracing();
    let source = RssFeedSource::new(
        update_articles::config::DEFAULT_FEED_URL,
        FetchConfig::default(),
    )
    .unwrap();

    let items = update_articles::FeedSource::fetch_items(&source).await.unwrap();
    info!("Fetched {} items from the live feed", items.len());
    assert!(!items.is_empty());
    assert!(items.iter().all(|item| !item.link.is_empty()));
}
