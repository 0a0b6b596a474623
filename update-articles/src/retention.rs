use crate::types::{Article, FeedItem};
use chrono::{DateTime, Duration, Utc};

/// Anything that carries an optional publication timestamp.
pub trait Dated {
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

impl Dated for FeedItem {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

impl Dated for Article {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.published_at)
    }
}

/// Oldest timestamp still inside the horizon. Saturates at the earliest
/// representable instant.
pub fn cutoff(reference: DateTime<Utc>, horizon_days: u32) -> DateTime<Utc> {
    reference
        .checked_sub_signed(Duration::days(i64::from(horizon_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Undated values count as `reference`, so they are never expired.
pub fn effective_timestamp<T: Dated>(value: &T, reference: DateTime<Utc>) -> DateTime<Utc> {
    value.timestamp().unwrap_or(reference)
}

pub fn is_recent<T: Dated>(value: &T, reference: DateTime<Utc>, horizon_days: u32) -> bool {
    effective_timestamp(value, reference) >= cutoff(reference, horizon_days)
}

/// Keeps the values whose effective timestamp is at or after
/// `reference - horizon_days`, preserving order.
pub fn filter_recent<T: Dated>(
    values: Vec<T>,
    reference: DateTime<Utc>,
    horizon_days: u32,
) -> Vec<T> {
    values
        .into_iter()
        .filter(|value| is_recent(value, reference, horizon_days))
        .collect()
}
