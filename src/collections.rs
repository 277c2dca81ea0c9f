use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A backend content collection. Each variant maps to one endpoint
/// (`<base>/<wire name>`), and the set is fixed: items that cannot be
/// attributed to one of these are dropped, since no detail link can be
/// built for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Collection {
    Movies,
    AnimeMovie,
    AnimeSeries,
    WebSeries,
    KDramas,
    CDramas,
    ThaiDramas,
    JapaneseDramas,
    PakistaniDramas,
    PcGames,
    PcApps,
    AndroidGames,
    AndroidApps,
    IosGames,
    ModApks,
}

impl Collection {
    /// Every collection the backend serves, in a stable order. Merge
    /// tie-breaking relies on this ordering, not on network arrival order.
    pub const ALL: [Collection; 15] = [
        Collection::Movies,
        Collection::AnimeMovie,
        Collection::AnimeSeries,
        Collection::WebSeries,
        Collection::KDramas,
        Collection::CDramas,
        Collection::ThaiDramas,
        Collection::JapaneseDramas,
        Collection::PakistaniDramas,
        Collection::PcGames,
        Collection::PcApps,
        Collection::AndroidGames,
        Collection::AndroidApps,
        Collection::IosGames,
        Collection::ModApks,
    ];

    /// Collections polled by the combined search fan-out. The drama
    /// collections are reachable by detail link and collection-scoped
    /// listing but are not part of the cross-collection search.
    pub const SEARCHED: [Collection; 10] = [
        Collection::Movies,
        Collection::AnimeMovie,
        Collection::AnimeSeries,
        Collection::WebSeries,
        Collection::PcGames,
        Collection::PcApps,
        Collection::AndroidGames,
        Collection::AndroidApps,
        Collection::IosGames,
        Collection::ModApks,
    ];

    /// Collections polled by the latest-updates feed.
    pub const FEED: [Collection; 4] = [
        Collection::Movies,
        Collection::WebSeries,
        Collection::AnimeMovie,
        Collection::AnimeSeries,
    ];

    /// Wire name as used in endpoint paths and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Movies => "movies",
            Collection::AnimeMovie => "animeMovie",
            Collection::AnimeSeries => "animeSeries",
            Collection::WebSeries => "webSeries",
            Collection::KDramas => "kDramas",
            Collection::CDramas => "cDramas",
            Collection::ThaiDramas => "thaiDramas",
            Collection::JapaneseDramas => "japaneseDramas",
            Collection::PakistaniDramas => "pakistaniDramas",
            Collection::PcGames => "pcGames",
            Collection::PcApps => "pcApps",
            Collection::AndroidGames => "androidGames",
            Collection::AndroidApps => "androidApps",
            Collection::IosGames => "iosGames",
            Collection::ModApks => "modApks",
        }
    }

    pub fn in_group(&self, group: CategoryGroup) -> bool {
        use Collection::*;
        match group {
            CategoryGroup::All => true,
            CategoryGroup::Movie => matches!(self, Movies | AnimeMovie),
            CategoryGroup::Anime => matches!(self, AnimeMovie | AnimeSeries),
            CategoryGroup::Series => matches!(self, WebSeries | AnimeSeries),
            CategoryGroup::Drama => matches!(
                self,
                KDramas | CDramas | ThaiDramas | JapaneseDramas | PakistaniDramas
            ),
            CategoryGroup::Game => matches!(self, PcGames | AndroidGames | IosGames),
            CategoryGroup::App => matches!(self, PcApps | AndroidApps | ModApks),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("unknown collection: {s}"))
    }
}

impl TryFrom<String> for Collection {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Collection> for String {
    fn from(c: Collection) -> String {
        c.as_str().to_string()
    }
}

/// Named group of collections used by the category filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryGroup {
    #[default]
    All,
    Movie,
    Anime,
    Series,
    Drama,
    Game,
    App,
}

impl FromStr for CategoryGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(CategoryGroup::All),
            "movie" | "movies" => Ok(CategoryGroup::Movie),
            "anime" => Ok(CategoryGroup::Anime),
            "series" => Ok(CategoryGroup::Series),
            "drama" | "dramas" => Ok(CategoryGroup::Drama),
            "game" | "games" => Ok(CategoryGroup::Game),
            "app" | "apps" => Ok(CategoryGroup::App),
            _ => Err(anyhow::anyhow!("unknown category group: {s}")),
        }
    }
}
