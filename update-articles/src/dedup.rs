use crate::types::{Article, FeedItem};
use std::collections::HashSet;

/// Case-folded, trimmed title used as the secondary duplicate signal.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Lookup sets built from the stored articles at the start of a run.
///
/// A feed item is a duplicate when either its exact link or its normalized
/// title is already known. Articles written during the run are added with
/// [`DedupIndex::insert`] so repeats inside one batch are caught too.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    by_link: HashSet<String>,
    by_normalized_title: HashSet<String>,
}

impl DedupIndex {
    pub fn from_articles<'a, I>(articles: I) -> Self
    where
        I: IntoIterator<Item = &'a Article>,
    {
        let mut index = Self::default();
        for article in articles {
            index.insert(&article.link, &article.title);
        }
        index
    }

    pub fn insert(&mut self, link: &str, title: &str) {
        self.by_link.insert(link.to_string());
        let normalized = normalize_title(title);
        if !normalized.is_empty() {
            self.by_normalized_title.insert(normalized);
        }
    }

    pub fn is_duplicate(&self, item: &FeedItem) -> bool {
        self.by_link.contains(&item.link)
            || self.by_normalized_title.contains(&normalize_title(&item.title))
    }

    pub fn len(&self) -> usize {
        self.by_link.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_link.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored(link: &str, title: &str) -> Article {
        Article {
            id: crate::ids::derive_id(link),
            title: title.to_string(),
            link: link.to_string(),
            description: String::new(),
            translated_title: title.to_string(),
            translated_description: String::new(),
            tags: Vec::new(),
            extracted_links: Vec::new(),
            published_at: Utc::now(),
        }
    }

    #[test]
    fn exact_link_match_is_duplicate() {
        let articles = vec![stored("https://example.com/a", "First")];
        let index = DedupIndex::from_articles(&articles);

        assert!(index.is_duplicate(&FeedItem::new("Something else", "https://example.com/a")));
        assert!(!index.is_duplicate(&FeedItem::new("Something else", "https://example.com/a?x=1")));
    }

    #[test]
    fn normalized_title_match_is_duplicate_even_with_new_link() {
        let articles = vec![stored("https://example.com/a", "  Azure Update: GA  ")];
        let index = DedupIndex::from_articles(&articles);

        let item = FeedItem::new("azure update: ga", "https://mirror.example.com/a?utm=1");
        assert!(index.is_duplicate(&item));
    }

    #[test]
    fn blank_titles_do_not_match_each_other() {
        let articles = vec![stored("https://example.com/a", "   ")];
        let index = DedupIndex::from_articles(&articles);

        assert!(!index.is_duplicate(&FeedItem::new("", "https://example.com/b")));
    }

    #[test]
    fn insert_extends_the_index() {
        let mut index = DedupIndex::default();
        assert!(index.is_empty());

        index.insert("https://example.com/a", "Title");
        assert_eq!(index.len(), 1);
        assert!(index.is_duplicate(&FeedItem::new("TITLE", "https://example.com/other")));
    }
}
