use crate::types::{FetchConfig, Result, UpdaterError};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str =
    "https://www.microsoft.com/releasecommunications/api/v2/azure/rss";
pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const MAX_RETENTION_DAYS: u32 = 36_500;
pub const DEFAULT_UPDATE_LIMIT: usize = 100;
pub const DEFAULT_ENRICHMENT_DELAY_SECS: u64 = 3;
pub const DEFAULT_GENERIC_TAG: &str = "Azure";

const REQUIRED_VARS: [&str; 2] = ["GROQ_API_KEY", "DATABASE_URL"];

const KNOWN_VARS: [&str; 10] = [
    "GROQ_API_KEY",
    "DATABASE_URL",
    "FEED_URL",
    "ARTICLE_RETENTION_DAYS",
    "UPDATE_LIMIT",
    "ENRICHMENT_DELAY_SECS",
    "GROQ_MODEL",
    "GROQ_API_URL",
    "GENERIC_TAG",
    "LOG_LEVEL",
];

/// Settings for a deployment of the updater, read once at startup.
#[derive(Clone)]
pub struct UpdaterConfig {
    pub groq_api_key: String,
    pub database_url: String,
    pub feed_url: String,
    pub retention_days: u32,
    pub update_limit: usize,
    pub enrichment_delay: Duration,
    pub groq_model: String,
    pub groq_api_url: String,
    pub generic_tag: String,
    pub log_level: String,
    pub fetch: FetchConfig,
}

impl UpdaterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|&key| get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(UpdaterError::MissingConfig { missing });
        }

        let config = Self {
            groq_api_key: get("GROQ_API_KEY").unwrap_or_default(),
            database_url: get("DATABASE_URL").unwrap_or_default(),
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            retention_days: parse_var(&get, "ARTICLE_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
            update_limit: parse_var(&get, "UPDATE_LIMIT", DEFAULT_UPDATE_LIMIT)?,
            enrichment_delay: Duration::from_secs(parse_var(
                &get,
                "ENRICHMENT_DELAY_SECS",
                DEFAULT_ENRICHMENT_DELAY_SECS,
            )?),
            groq_model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            groq_api_url: get("GROQ_API_URL").unwrap_or_else(|| DEFAULT_GROQ_API_URL.to_string()),
            generic_tag: get("GENERIC_TAG").unwrap_or_else(|| DEFAULT_GENERIC_TAG.to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            fetch: FetchConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads only `DATABASE_URL`, for commands that never fetch or enrich.
    pub fn database_url_from_env() -> Result<String> {
        Self::database_url_from_lookup(|key| std::env::var(key).ok())
    }

    pub fn database_url_from_lookup<F>(lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| UpdaterError::MissingConfig {
                missing: vec!["DATABASE_URL".to_string()],
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention_days == 0 {
            return Err(UpdaterError::InvalidConfig {
                key: "ARTICLE_RETENTION_DAYS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(UpdaterError::InvalidConfig {
                key: "ARTICLE_RETENTION_DAYS".to_string(),
                reason: format!("must be at most {}", MAX_RETENTION_DAYS),
            });
        }

        let parsed = url::Url::parse(&self.feed_url).map_err(|e| UpdaterError::InvalidConfig {
            key: "FEED_URL".to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UpdaterError::InvalidConfig {
                key: "FEED_URL".to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        if self.generic_tag.trim().is_empty() {
            return Err(UpdaterError::InvalidConfig {
                key: "GENERIC_TAG".to_string(),
                reason: "must not be blank".to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Debug for UpdaterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdaterConfig")
            .field("groq_api_key", &"[REDACTED]")
            .field("database_url", &"[REDACTED]")
            .field("feed_url", &self.feed_url)
            .field("retention_days", &self.retention_days)
            .field("update_limit", &self.update_limit)
            .field("enrichment_delay", &self.enrichment_delay)
            .field("groq_model", &self.groq_model)
            .field("groq_api_url", &self.groq_api_url)
            .field("generic_tag", &self.generic_tag)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| UpdaterError::InvalidConfig {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Which variables were present in the environment. Never carries values.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReport {
    pub present: Vec<VarPresence>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VarPresence {
    pub name: &'static str,
    pub present: bool,
}

impl ConfigReport {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = KNOWN_VARS
            .iter()
            .copied()
            .map(|name| VarPresence {
                name,
                present: lookup(name).is_some_and(|v| !v.trim().is_empty()),
            })
            .collect();
        Self { present }
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.present.iter().any(|var| var.name == name && var.present)
    }
}
