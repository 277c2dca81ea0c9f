use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::collections::Collection;

/// Normalized media record, the unit the whole pipeline operates on.
///
/// Field names serialize in the backend's camelCase wire shape so cache
/// payloads stay readable next to raw responses and re-normalizing a
/// serialized item is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub slug: String,
    pub title: String,
    /// Always the collection whose endpoint produced the item; a raw `type`
    /// field never overrides it, so detail links stay constructable.
    #[serde(rename = "type")]
    pub collection: Collection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Quality label -> backend-defined detail (size, link info, ...).
    /// Only key presence matters to the quality filter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub qualities: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    // Carried for the latest-updates feed ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl MediaItem {
    /// Rating with the explicit unrated-is-zero default used by filters and
    /// sort tie-breaks.
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    /// Release date as epoch seconds; `None` when absent or unparsable.
    pub fn release_timestamp(&self) -> Option<i64> {
        self.release_date.as_deref().and_then(parse_date)
    }

    /// Release year, for the exact-year filter and the year dropdown.
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.as_deref().and_then(parse_year)
    }

    /// Timestamp the latest-updates feed orders by: updatedAt, else
    /// createdAt, else epoch 0.
    pub fn freshness_timestamp(&self) -> i64 {
        self.updated_at
            .as_deref()
            .or(self.created_at.as_deref())
            .and_then(parse_date)
            .unwrap_or(0)
    }
}

/// Parse a backend date string. Accepts RFC 3339 timestamps and bare
/// `YYYY-MM-DD` dates, which is all the backend has been seen to emit.
pub(crate) fn parse_date(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

pub(crate) fn parse_year(s: &str) -> Option<i32> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(chrono::Datelike::year(&dt.date_naive()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| chrono::Datelike::year(&d))
}
