use crate::traits::LlmAdapter;
use crate::types::{Result, UpdaterError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Chat-completion client for Groq's OpenAI-compatible endpoint.
pub struct GroqAdapter {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GroqAdapter {
    pub fn new(api_key: String, api_url: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_url,
            model,
            temperature: 0.1,
            max_tokens: 1500,
        })
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

impl fmt::Debug for GroqAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqAdapter")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl LlmAdapter for GroqAdapter {
    fn adapter_name(&self) -> String {
        format!("Groq ({})", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpdaterError::Llm(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdaterError::Llm(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| UpdaterError::Llm(format!("unreadable response body: {}", e)))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| UpdaterError::InvalidResponse("empty completion".to_string()))?;

        debug!("{} returned {} characters", self.adapter_name(), content.len());
        Ok(content)
    }
}

/// Mock LLM adapter for development and testing
pub struct MockLlmAdapter {
    name: String,
    response_delay_ms: u64,
    response: Mutex<MockResponse>,
    calls: AtomicUsize,
}

#[derive(Clone)]
enum MockResponse {
    Text(String),
    Failure(String),
}

impl MockLlmAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response_delay_ms: 0,
            response: Mutex::new(MockResponse::Text(
                r#"{"japaneseTitle": "テスト", "japaneseDescription": "説明", "technicalTags": ["Azure"], "extractedLinks": []}"#
                    .to_string(),
            )),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    /// Every call returns `text` verbatim
    pub fn responding(self, text: impl Into<String>) -> Self {
        self.set_response(MockResponse::Text(text.into()));
        self
    }

    /// Every call fails with an enrichment error
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.set_response(MockResponse::Failure(message.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_response(&self, response: MockResponse) {
        if let Ok(mut guard) = self.response.lock() {
            *guard = response;
        }
    }

    fn current_response(&self) -> MockResponse {
        self.response
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }

        debug!("Mock completion for prompt of {} characters", prompt.len());
        match self.current_response() {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Failure(message) => Err(UpdaterError::Llm(message)),
        }
    }
}
