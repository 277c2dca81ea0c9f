use serde_json::Value;
use tracing::debug;

use crate::api::RawItem;
use crate::collections::Collection;
use crate::media::MediaItem;

/// Map one raw backend item into the normalized `MediaItem` shape, tagging
/// it with the collection whose endpoint produced it.
///
/// Returns `None` for items without a usable title; those cannot be
/// displayed or sorted and are excluded rather than reported as errors.
/// Purely a mapping function: normalizing an already-normalized item again
/// yields the same record.
pub fn normalize(raw: &RawItem, collection: Collection) -> Option<MediaItem> {
    let title = match str_field(raw, &["title"]) {
        Some(t) => t,
        None => {
            debug!(collection = %collection, "dropping item without title");
            return None;
        }
    };

    let id = str_field(raw, &["_id", "id"]);
    let slug = str_field(raw, &["slug"])
        .or_else(|| id.clone())
        .unwrap_or_else(|| slug_from_title(&title));
    let id = id.unwrap_or_else(|| slug.clone());

    // The endpoint wins over any raw `type` field; a conflicting tag would
    // produce detail links that 404 against the endpoint the item came from.
    Some(MediaItem {
        id,
        slug,
        title,
        collection,
        thumbnail: str_field(raw, &["thumbnail", "posterUrl", "poster", "image"]),
        description: str_field(raw, &["description"]),
        rating: num_field(raw, "rating"),
        release_date: str_field(raw, &["releaseDate"]),
        qualities: raw
            .get("qualities")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
        genres: string_list(raw, "genres"),
        tags: string_list(raw, "tags"),
        created_at: str_field(raw, &["createdAt"]),
        updated_at: str_field(raw, &["updatedAt"]),
    })
}

/// Normalize a whole collection response, dropping malformed items.
pub fn normalize_all(raws: &[RawItem], collection: Collection) -> Vec<MediaItem> {
    raws.iter().filter_map(|r| normalize(r, collection)).collect()
}

/// URL-safe fallback slug: whitespace runs become single hyphens, everything
/// lower-cased.
pub fn slug_from_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_gap = false;
    for ch in title.trim().chars() {
        if ch.is_whitespace() {
            if !in_gap {
                out.push('-');
                in_gap = true;
            }
        } else {
            for low in ch.to_lowercase() {
                out.push(low);
            }
            in_gap = false;
        }
    }
    out
}

// First key holding a non-empty string (numbers are stringified, so numeric
// ids work too).
fn str_field(raw: &RawItem, keys: &[&str]) -> Option<String> {
    for key in keys {
        match raw.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn num_field(raw: &RawItem, key: &str) -> Option<f64> {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(raw: &RawItem, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
