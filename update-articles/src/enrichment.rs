use crate::traits::LlmAdapter;
use crate::types::{EnrichmentRecord, Result, UpdaterError};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How an enrichment record was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Translated,
    Fallback { reason: String },
}

#[derive(Debug, Clone)]
pub struct Enrichment {
    pub record: EnrichmentRecord,
    pub outcome: EnrichmentOutcome,
    pub elapsed: Duration,
}

impl Enrichment {
    pub fn is_translated(&self) -> bool {
        self.outcome == EnrichmentOutcome::Translated
    }
}

/// Wraps an [`LlmAdapter`] so a single item never fails the batch.
pub struct Enricher {
    adapter: Arc<dyn LlmAdapter>,
    generic_tag: String,
}

impl Enricher {
    pub fn new(adapter: Arc<dyn LlmAdapter>, generic_tag: impl Into<String>) -> Self {
        Self {
            adapter,
            generic_tag: generic_tag.into(),
        }
    }

    pub fn generic_tag(&self) -> &str {
        &self.generic_tag
    }

    pub async fn enrich(&self, title: &str, content: &str) -> Enrichment {
        let started = Instant::now();
        let result = self.try_enrich(title, content).await;
        let elapsed = started.elapsed();

        match result {
            Ok(record) => Enrichment {
                record,
                outcome: EnrichmentOutcome::Translated,
                elapsed,
            },
            Err(e) => {
                warn!("Enrichment failed for \"{}\", using fallback: {}", title, e);
                Enrichment {
                    record: EnrichmentRecord::fallback(title, content, &self.generic_tag),
                    outcome: EnrichmentOutcome::Fallback {
                        reason: e.to_string(),
                    },
                    elapsed,
                }
            }
        }
    }

    async fn try_enrich(&self, title: &str, content: &str) -> Result<EnrichmentRecord> {
        let prompt = build_prompt(title, content);
        let response = self.adapter.complete(&prompt).await?;
        debug!("Raw enrichment response: {}", response);
        parse_enrichment(&response, title, content, &self.generic_tag)
    }
}

pub fn build_prompt(title: &str, content: &str) -> String {
    format!(
        r#"Translate the following Azure update into accurate, natural Japanese and extract its technical details.

Title: {title}
Content: {content}

Respond with exactly one JSON object in this shape and nothing else:
{{
  "japaneseTitle": "Japanese title",
  "japaneseDescription": "complete Japanese translation of the content",
  "technicalTags": ["Product or technology name"],
  "extractedLinks": []
}}

Rules:
1. Output only the JSON object. No commentary.
2. japaneseTitle: the title translated into Japanese. Use ASCII double quotes (") only.
3. japaneseDescription: the full content translated into Japanese. If the content looks truncated, complete it from the title where the meaning is clear. Never stop mid-sentence.
4. technicalTags: concrete product, service, processor or language names, in English. Do not include the bare word "Azure", Japanese words, or status words such as "preview" or "retired".
5. extractedLinks: Microsoft documentation, migration guide or learn.microsoft.com / aka.ms links referenced by the update.
6. Escape any double quote inside a JSON string as \"."#
    )
}

/// Straight double quotes replace U+201C, U+201D and U+FF02; straight single
/// quotes replace U+2018 and U+2019.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{FF02}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Slice from the first `{` to the last `}`, or the trimmed text when no
/// such span exists.
pub fn outermost_object(text: &str) -> &str {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Parses a model response into a record, filling absent or mistyped
/// fields from the original item.
pub fn parse_enrichment(
    response: &str,
    title: &str,
    content: &str,
    generic_tag: &str,
) -> Result<EnrichmentRecord> {
    if response.trim().is_empty() {
        return Err(UpdaterError::InvalidResponse("empty response".to_string()));
    }

    let normalized = normalize_quotes(outermost_object(response));
    let value: Value = serde_json::from_str(&normalized)
        .map_err(|e| UpdaterError::InvalidResponse(format!("not a JSON object: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| UpdaterError::InvalidResponse("top-level value is not an object".to_string()))?;

    let text_field = |key: &str, fallback: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    let tags = match object.get("technicalTags") {
        Some(Value::Array(values)) => string_elements(values),
        _ => vec![generic_tag.to_string()],
    };

    let extracted_links = match object.get("extractedLinks") {
        Some(Value::Array(values)) => {
            let mut links = string_elements(values);
            let mut seen = std::collections::HashSet::new();
            links.retain(|link| seen.insert(link.clone()));
            links
        }
        _ => Vec::new(),
    };

    Ok(EnrichmentRecord {
        translated_title: text_field("japaneseTitle", title),
        translated_description: text_field("japaneseDescription", content),
        tags,
        extracted_links,
    })
}

fn string_elements(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_adapter::MockLlmAdapter;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let response = r#"Sure! Here it is:
{"japaneseTitle": "タイトル", "japaneseDescription": "説明", "technicalTags": ["Azure Functions"], "extractedLinks": ["https://aka.ms/x"]}
Hope this helps."#;
        let record = parse_enrichment(response, "Title", "Body", "Azure").unwrap();

        assert_eq!(record.translated_title, "タイトル");
        assert_eq!(record.translated_description, "説明");
        assert_eq!(record.tags, vec!["Azure Functions"]);
        assert_eq!(record.extracted_links, vec!["https://aka.ms/x"]);
    }

    #[test]
    fn normalizes_typographic_quotes_before_parsing() {
        let response = "{\u{201C}japaneseTitle\u{201D}: \u{201C}翻訳\u{201D}, \u{FF02}technicalTags\u{FF02}: []}";
        let record = parse_enrichment(response, "Title", "Body", "Azure").unwrap();

        assert_eq!(record.translated_title, "翻訳");
        assert_eq!(record.translated_description, "Body");
        assert!(record.tags.is_empty());
    }

    #[test]
    fn fields_fall_back_independently() {
        let response = r#"{"japaneseTitle": "", "technicalTags": "Azure Storage", "extractedLinks": ["a", "a", 3, "b"]}"#;
        let record = parse_enrichment(response, "Title", "Body", "Azure").unwrap();

        assert_eq!(record.translated_title, "Title");
        assert_eq!(record.translated_description, "Body");
        assert_eq!(record.tags, vec!["Azure"]);
        assert_eq!(record.extracted_links, vec!["a", "b"]);
    }

    #[test]
    fn unterminated_json_is_rejected() {
        let err = parse_enrichment(r#"Sure! {"japaneseTitle": "X""#, "Title", "Body", "Azure").unwrap_err();
        assert!(matches!(err, UpdaterError::InvalidResponse(_)));
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(parse_enrichment("[1, 2]", "Title", "Body", "Azure").is_err());
        assert!(parse_enrichment("   ", "Title", "Body", "Azure").is_err());
    }

    #[tokio::test]
    async fn malformed_response_yields_fallback_record() {
        let adapter = Arc::new(MockLlmAdapter::new("malformed").responding(r#"Sure! {"japaneseTitle": "X""#));
        let enricher = Enricher::new(adapter.clone(), "Azure");

        let enrichment = enricher.enrich("Original title", "Original body").await;

        assert!(!enrichment.is_translated());
        assert_eq!(enrichment.record, EnrichmentRecord::fallback("Original title", "Original body", "Azure"));
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn adapter_failure_yields_fallback_record() {
        let adapter = Arc::new(MockLlmAdapter::new("down").failing("connection reset"));
        let enricher = Enricher::new(adapter, "Azure");
        assert_eq!(enricher.generic_tag(), "Azure");

        let enrichment = enricher.enrich("T", "C").await;
        match enrichment.outcome {
            EnrichmentOutcome::Fallback { reason } => assert!(reason.contains("connection reset")),
            EnrichmentOutcome::Translated => panic!("expected fallback"),
        }
        assert_eq!(enrichment.record.tags, vec![enricher.generic_tag()]);
    }

    #[tokio::test]
    async fn successful_response_is_translated() {
        let adapter = Arc::new(MockLlmAdapter::new("ok"));
        let enricher = Enricher::new(adapter, "Azure");

        let enrichment = enricher.enrich("Test", "Body").await;
        assert!(enrichment.is_translated());
        assert_eq!(enrichment.record.translated_title, "テスト");
    }

    #[test]
    fn prompt_names_every_expected_key() {
        let prompt = build_prompt("A title", "Some content");
        for key in ["japaneseTitle", "japaneseDescription", "technicalTags", "extractedLinks"] {
            assert!(prompt.contains(key));
        }
        assert!(prompt.contains("A title"));
    }
}
