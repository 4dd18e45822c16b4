//! CatalogStore trait definition and the query specifications it accepts.
//!
//! Every read states up front which song relations it needs through
//! [`SongRelations`]; implementations load exactly those, in batches.

use super::models::{AlbumEntity, AlbumRankRow, CatalogCounts, Month, SongEntity};
use anyhow::Result;

/// Which relations of a song to load alongside it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SongRelations {
    pub artists: bool,
    pub writers: bool,
    pub album: bool,
    pub monthly_plays: bool,
}

impl SongRelations {
    pub const NONE: SongRelations = SongRelations {
        artists: false,
        writers: false,
        album: false,
        monthly_plays: false,
    };

    pub const ALL: SongRelations = SongRelations {
        artists: true,
        writers: true,
        album: true,
        monthly_plays: true,
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SongFilter {
    /// Exact match on the release year.
    ReleaseYear(i32),
    /// Case-insensitive substring match on the title or on any artist name.
    TitleOrArtistContains(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

/// Filtered find over songs, ordered by title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongFind {
    pub filter: SongFilter,
    pub relations: SongRelations,
    pub page: Option<Page>,
}

/// Songs joined to their monthly plays, one result per play row, ordered by
/// play count descending.
///
/// Each returned song carries exactly the play row it was ranked by in
/// `monthly_plays`, regardless of `relations.monthly_plays`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayRankQuery {
    pub month: Option<Month>,
    pub limit: usize,
    pub relations: SongRelations,
}

/// Albums grouped over their songs and plays, `songs_count > 0` only,
/// ordered by total plays descending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumRankQuery {
    pub month: Option<Month>,
    pub limit: usize,
}

/// Trait for catalog storage backends.
///
/// Implementations are blocking; async callers are expected to run them on
/// a blocking thread.
pub trait CatalogStore: Send + Sync {
    /// Filtered find over songs.
    fn find_songs(&self, find: &SongFind) -> Result<Vec<SongEntity>>;

    /// Multi-join of songs and monthly plays ranked by play count.
    fn find_song_play_rows(&self, query: &PlayRankQuery) -> Result<Vec<SongEntity>>;

    /// Grouped album aggregate, the first phase of album ranking.
    fn rank_albums(&self, query: &AlbumRankQuery) -> Result<Vec<AlbumRankRow>>;

    /// Batched lookup of albums by public id, each with its songs (ordered by
    /// title) and the given song relations. Unknown ids are skipped and the
    /// result order is unspecified.
    fn find_albums_by_ids(
        &self,
        ids: &[String],
        song_relations: &SongRelations,
    ) -> Result<Vec<AlbumEntity>>;

    /// Number of rows per entity table.
    fn get_counts(&self) -> Result<CatalogCounts>;
}
