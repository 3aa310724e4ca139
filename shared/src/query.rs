use std::str::FromStr;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_VOTES: u32 = 100;
pub const RECENT_LIKED_MIN_VOTES: u32 = 50;
pub const RECENT_LIKED_WINDOW_MONTHS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "popularity.desc")]
    Popularity,
    #[serde(rename = "primary_release_date.desc")]
    ReleaseDate,
    #[serde(rename = "vote_average.desc")]
    Rating,
}

impl SortOrder {
    pub fn as_param(self) -> &'static str {
        match self {
            SortOrder::Popularity => "popularity.desc",
            SortOrder::ReleaseDate => "primary_release_date.desc",
            SortOrder::Rating => "vote_average.desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "popularity.desc" => Ok(SortOrder::Popularity),
            "primary_release_date.desc" => Ok(SortOrder::ReleaseDate),
            "vote_average.desc" => Ok(SortOrder::Rating),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Navigation shortcuts that rewrite the whole query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPreset {
    Recent,
    Liked,
    RecentLiked,
}

/// Filter/sort parameters of one catalog "universe".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub genre: Option<u32>,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub released_after: Option<NaiveDate>,
    #[serde(default = "default_min_votes")]
    pub min_votes: u32,
}

fn default_min_votes() -> u32 {
    DEFAULT_MIN_VOTES
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            genre: None,
            sort: SortOrder::Popularity,
            released_after: None,
            min_votes: DEFAULT_MIN_VOTES,
        }
    }
}

impl CatalogQuery {
    /// Picking a genre starts from the default sort and thresholds.
    pub fn with_genre(genre: Option<u32>) -> Self {
        Self {
            genre,
            ..Self::default()
        }
    }

    /// Apply a navigation preset, keeping the current genre.
    pub fn preset(&self, preset: QueryPreset, today: NaiveDate) -> Self {
        let genre = self.genre;
        match preset {
            QueryPreset::Recent => Self {
                genre,
                sort: SortOrder::ReleaseDate,
                released_after: None,
                min_votes: DEFAULT_MIN_VOTES,
            },
            QueryPreset::Liked => Self {
                genre,
                sort: SortOrder::Rating,
                released_after: None,
                min_votes: DEFAULT_MIN_VOTES,
            },
            QueryPreset::RecentLiked => Self {
                genre,
                sort: SortOrder::Rating,
                released_after: today.checked_sub_months(Months::new(RECENT_LIKED_WINDOW_MONTHS)),
                min_votes: RECENT_LIKED_MIN_VOTES,
            },
        }
    }

    /// Query-string pairs for `GET /api/discover`.
    pub fn to_params(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(5);
        if let Some(genre) = self.genre {
            params.push(("genre", genre.to_string()));
        }
        params.push(("sort", self.sort.as_param().to_string()));
        if let Some(date) = self.released_after {
            params.push(("released_after", date.format("%Y-%m-%d").to_string()));
        }
        params.push(("min_votes", self.min_votes.to_string()));
        params.push(("page", page.to_string()));
        params
    }
}
