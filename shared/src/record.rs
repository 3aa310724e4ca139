use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable catalog identifier. Two records with the same id are the same title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable catalog entry. Only `id`, `title` and `image_path` are required;
/// everything else is carried through for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: RecordId,
    pub title: String,
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u32>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
}

impl CatalogRecord {
    /// Full image URL for a given size base, e.g. `https://image.tmdb.org/t/p/w500`.
    pub fn image_url(&self, base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), self.image_path)
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|date| chrono::Datelike::year(&date))
    }
}

/// The loosely-typed shape returned by the upstream discover endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCatalogRecord {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub vote_count: Option<u32>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordRejection {
    #[error("record has no id")]
    MissingId,
    #[error("record {0} has no title")]
    MissingTitle(u64),
    #[error("record {0} has no image")]
    MissingImage(u64),
}

impl TryFrom<RawCatalogRecord> for CatalogRecord {
    type Error = RecordRejection;

    fn try_from(raw: RawCatalogRecord) -> Result<Self, Self::Error> {
        let id = raw.id.ok_or(RecordRejection::MissingId)?;
        let title = non_blank(raw.title).ok_or(RecordRejection::MissingTitle(id))?;
        let image_path = non_blank(raw.poster_path).ok_or(RecordRejection::MissingImage(id))?;

        // Upstream sends "" for unknown release dates.
        let release_date = raw
            .release_date
            .as_deref()
            .and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok());

        Ok(Self {
            id: RecordId(id),
            title,
            image_path,
            overview: non_blank(raw.overview),
            release_date,
            vote_average: raw.vote_average,
            vote_count: raw.vote_count,
            genre_ids: raw.genre_ids,
            backdrop_path: non_blank(raw.backdrop_path),
            original_language: non_blank(raw.original_language),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
