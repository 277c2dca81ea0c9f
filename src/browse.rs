//! Pure filter/sort/paginate over a combined result set. Nothing here
//! touches the network or the cache; callers hand in whatever `Multiverse`
//! produced.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::collections::CategoryGroup;
use crate::media::MediaItem;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Rating,
    Title,
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(SortKey::Newest),
            "oldest" => Ok(SortKey::Oldest),
            "rating" => Ok(SortKey::Rating),
            "title" => Ok(SortKey::Title),
            _ => Err(anyhow::anyhow!("unknown sort key: {s}")),
        }
    }
}

/// Active filter/sort/page selection. All filters are optional and
/// AND-composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseOptions {
    pub category: CategoryGroup,
    /// Quality label that must be present in the item's `qualities` map.
    pub quality: Option<String>,
    pub min_rating: f64,
    /// Exact release year; items with unparsable dates are excluded while
    /// this is set.
    pub year: Option<i32>,
    pub sort: SortKey,
    /// 1-based; out-of-range pages clamp to the last valid page.
    pub page: usize,
    pub page_size: usize,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            category: CategoryGroup::All,
            quality: None,
            min_rating: 0.0,
            year: None,
            sort: SortKey::Newest,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowsePage {
    pub items: Vec<MediaItem>,
    /// The page actually served, after clamping.
    pub page: usize,
    pub total_pages: usize,
    /// Matching items before pagination.
    pub total_items: usize,
}

/// Apply filters, sort, and pagination in that order.
pub fn apply(items: &[MediaItem], opts: &BrowseOptions) -> BrowsePage {
    let mut matched: Vec<MediaItem> = items.iter().filter(|i| matches(i, opts)).cloned().collect();
    matched.sort_by(|a, b| compare(a, b, opts.sort));

    let page_size = opts.page_size.max(1);
    let total_items = matched.len();
    let total_pages = total_items.div_ceil(page_size);
    let page = opts.page.clamp(1, total_pages.max(1));

    let start = (page - 1) * page_size;
    let items = matched.into_iter().skip(start).take(page_size).collect();
    BrowsePage {
        items,
        page,
        total_pages,
        total_items,
    }
}

fn matches(item: &MediaItem, opts: &BrowseOptions) -> bool {
    if !item.collection.in_group(opts.category) {
        return false;
    }
    if let Some(q) = &opts.quality {
        if !item.qualities.contains_key(q) {
            return false;
        }
    }
    if item.rating_or_zero() < opts.min_rating {
        return false;
    }
    if let Some(year) = opts.year {
        // Unparsable dates are excluded whenever a year filter is active.
        if item.release_year() != Some(year) {
            return false;
        }
    }
    true
}

fn compare(a: &MediaItem, b: &MediaItem, sort: SortKey) -> Ordering {
    let date = |i: &MediaItem| i.release_timestamp().unwrap_or(0);
    let rating_desc = |a: &MediaItem, b: &MediaItem| b.rating_or_zero().total_cmp(&a.rating_or_zero());
    let title_asc = |a: &MediaItem, b: &MediaItem| a.title.to_lowercase().cmp(&b.title.to_lowercase());

    match sort {
        SortKey::Newest => date(b)
            .cmp(&date(a))
            .then_with(|| rating_desc(a, b))
            .then_with(|| title_asc(a, b)),
        SortKey::Oldest => date(a)
            .cmp(&date(b))
            .then_with(|| rating_desc(a, b))
            .then_with(|| title_asc(a, b)),
        SortKey::Rating => rating_desc(a, b)
            .then_with(|| date(b).cmp(&date(a)))
            .then_with(|| title_asc(a, b)),
        SortKey::Title => title_asc(a, b)
            .then_with(|| rating_desc(a, b))
            .then_with(|| date(b).cmp(&date(a))),
    }
}

/// Distinct parseable release years across a set, newest first. Feeds the
/// year-filter dropdown.
pub fn years_available(items: &[MediaItem]) -> Vec<i32> {
    let mut years: Vec<i32> = items.iter().filter_map(|i| i.release_year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Sort a set by freshness (updatedAt, else createdAt) and keep the newest
/// `limit`. The latest-updates feed runs on this.
pub fn latest(items: &[MediaItem], limit: usize) -> Vec<MediaItem> {
    let mut sorted: Vec<MediaItem> = items.to_vec();
    sorted.sort_by(|a, b| {
        b.freshness_timestamp()
            .cmp(&a.freshness_timestamp())
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Collection;
    use std::collections::BTreeMap;

    fn item(title: &str, rating: Option<f64>, date: Option<&str>) -> MediaItem {
        MediaItem {
            id: title.to_lowercase(),
            slug: title.to_lowercase(),
            title: title.to_string(),
            collection: Collection::Movies,
            thumbnail: None,
            description: None,
            rating,
            release_date: date.map(|s| s.to_string()),
            qualities: BTreeMap::new(),
            genres: Vec::new(),
            tags: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn rating_ties_break_by_title_ascending() {
        let items = vec![
            item("B", Some(5.0), Some("2020-01-01")),
            item("A", Some(5.0), Some("2020-01-01")),
        ];
        let page = apply(
            &items,
            &BrowseOptions {
                sort: SortKey::Rating,
                ..Default::default()
            },
        );
        let titles: Vec<&str> = page.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
    }

    #[test]
    fn newest_treats_missing_date_as_epoch_zero() {
        let items = vec![
            item("Undated", Some(9.0), None),
            item("Dated", Some(1.0), Some("2021-05-05")),
        ];
        let page = apply(&items, &BrowseOptions::default());
        assert_eq!(page.items[0].title, "Dated");
    }

    #[test]
    fn out_of_range_page_clamps_to_last() {
        let items: Vec<MediaItem> = (0..45)
            .map(|i| item(&format!("T{i:02}"), None, None))
            .collect();
        let last = apply(
            &items,
            &BrowseOptions {
                page: 3,
                ..Default::default()
            },
        );
        let clamped = apply(
            &items,
            &BrowseOptions {
                page: 10,
                ..Default::default()
            },
        );
        assert_eq!(last.total_pages, 3);
        assert_eq!(clamped.page, 3);
        assert_eq!(clamped.items, last.items);
        assert_eq!(clamped.items.len(), 5);
    }

    #[test]
    fn empty_set_serves_page_one_of_zero() {
        let page = apply(&[], &BrowseOptions { page: 7, ..Default::default() });
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn year_filter_excludes_unparsable_dates() {
        let items = vec![
            item("Good", None, Some("2020-03-01")),
            item("Bad", None, Some("not-a-date")),
            item("None", None, None),
        ];
        let filtered = apply(
            &items,
            &BrowseOptions {
                year: Some(2020),
                ..Default::default()
            },
        );
        assert_eq!(filtered.total_items, 1);
        assert_eq!(filtered.items[0].title, "Good");

        // Without a year filter the unparsable ones stay in.
        let unfiltered = apply(&items, &BrowseOptions::default());
        assert_eq!(unfiltered.total_items, 3);
    }

    #[test]
    fn quality_filter_requires_label_presence() {
        let mut hd = item("HD", None, None);
        hd.qualities.insert("1080p".into(), serde_json::json!({"size": "2GB"}));
        let sd = item("SD", None, None);
        let page = apply(
            &[hd, sd],
            &BrowseOptions {
                quality: Some("1080p".into()),
                ..Default::default()
            },
        );
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].title, "HD");
    }

    #[test]
    fn min_rating_treats_unrated_as_zero() {
        let items = vec![item("Rated", Some(6.0), None), item("Unrated", None, None)];
        let page = apply(
            &items,
            &BrowseOptions {
                min_rating: 5.0,
                ..Default::default()
            },
        );
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].title, "Rated");
    }

    #[test]
    fn years_listed_newest_first_without_duplicates() {
        let items = vec![
            item("A", None, Some("2019-01-01")),
            item("B", None, Some("2022-06-01")),
            item("C", None, Some("2019-12-31")),
            item("D", None, None),
        ];
        assert_eq!(years_available(&items), vec![2022, 2019]);
    }

    #[test]
    fn latest_orders_by_updated_then_created() {
        let mut a = item("A", None, None);
        a.created_at = Some("2024-01-01T00:00:00Z".into());
        let mut b = item("B", None, None);
        b.updated_at = Some("2024-06-01T00:00:00Z".into());
        let mut c = item("C", None, None);
        c.created_at = Some("2023-01-01T00:00:00Z".into());
        let feed = latest(&[a, b, c], 2);
        let titles: Vec<&str> = feed.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["B", "A"]);
    }
}
