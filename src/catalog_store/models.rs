//! Relational entities as loaded from the catalog database.
//!
//! Relation fields are `Option`: `None` means the relation was not loaded by
//! the query that produced the entity, `Some(vec![])` means it was loaded and
//! is empty. Row ids and foreign keys are internal to the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enumerations
// =============================================================================

/// Month a play count was recorded for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    June,
    July,
    August,
}

impl Month {
    pub const ALL: [Month; 3] = [Month::June, Month::July, Month::August];

    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "June" => Some(Month::June),
            "July" => Some(Month::July),
            "August" => Some(Month::August),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMonth(pub String);

impl fmt::Display for UnknownMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown month '{}', expected one of June, July, August",
            self.0
        )
    }
}

impl std::error::Error for UnknownMonth {}

/// Case-insensitive parsing, "june" and "JUNE" are both `Month::June`.
impl FromStr for Month {
    type Err = UnknownMonth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::ALL
            .into_iter()
            .find(|m| m.to_db_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMonth(s.to_string()))
    }
}

// =============================================================================
// Entities
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtistEntity {
    pub rowid: i64,
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriterEntity {
    pub rowid: i64,
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthlyPlayEntity {
    pub rowid: i64,
    pub id: String,
    pub song_rowid: i64,
    pub month: Month,
    pub play_count: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumEntity {
    pub rowid: i64,
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub songs: Option<Vec<SongEntity>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongEntity {
    pub rowid: i64,
    pub id: String,
    pub title: String,
    pub release_year: Option<i32>,
    pub album_rowid: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub artists: Option<Vec<ArtistEntity>>,
    pub writers: Option<Vec<WriterEntity>>,
    pub album: Option<AlbumEntity>,
    pub monthly_plays: Option<Vec<MonthlyPlayEntity>>,
}

/// One row of the album ranking aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumRankRow {
    pub album_id: String,
    pub title: String,
    pub songs_count: u64,
    pub total_plays: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub artists: usize,
    pub writers: usize,
    pub albums: usize,
    pub songs: usize,
    pub monthly_plays: usize,
}

// =============================================================================
// Import
// =============================================================================

/// One catalog row to import, the shape of a line of the source spreadsheet.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSong {
    pub title: String,
    #[serde(default, alias = "releaseYear")]
    pub year: Option<i32>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub plays: ImportPlays,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportPlays {
    #[serde(rename = "June")]
    pub june: Option<u64>,
    #[serde(rename = "July")]
    pub july: Option<u64>,
    #[serde(rename = "August")]
    pub august: Option<u64>,
}

impl ImportPlays {
    pub fn iter(&self) -> impl Iterator<Item = (Month, u64)> + '_ {
        [
            (Month::June, self.june),
            (Month::July, self.july),
            (Month::August, self.august),
        ]
        .into_iter()
        .filter_map(|(month, count)| count.map(|c| (month, c)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub artists_created: usize,
    pub writers_created: usize,
    pub albums_created: usize,
    pub songs_created: usize,
    pub plays_recorded: usize,
}
