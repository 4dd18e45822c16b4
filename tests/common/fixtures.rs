//! Test fixture creation for the catalog database

use super::constants::*;
use anyhow::Result;
use std::path::PathBuf;
use swiftcloud_server::catalog_store::{ImportPlays, ImportSong, SqliteCatalogStore};
use tempfile::TempDir;

fn row(
    title: &str,
    year: i32,
    album: &str,
    artists: &[&str],
    writers: &[&str],
    plays: (Option<u64>, Option<u64>, Option<u64>),
) -> ImportSong {
    ImportSong {
        title: title.to_string(),
        year: Some(year),
        album: Some(album.to_string()),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        writers: writers.iter().map(|w| w.to_string()).collect(),
        plays: ImportPlays {
            june: plays.0,
            july: plays.1,
            august: plays.2,
        },
    }
}

/// Rows of the fixture catalog.
///
/// Album totals: 1989 = 410, Fearless = 280, Red = 0.
/// "Safe & Sound" has no album and the single largest play row (August, 500).
/// "Éclair" has no album, no plays and no Taylor Swift credit.
pub fn fixture_rows() -> Vec<ImportSong> {
    vec![
        row(
            SONG_LOVE_STORY,
            2008,
            ALBUM_FEARLESS,
            &[ARTIST_TAYLOR],
            &[ARTIST_TAYLOR],
            (Some(100), Some(80), Some(60)),
        ),
        row(
            SONG_WHITE_HORSE,
            2008,
            ALBUM_FEARLESS,
            &[ARTIST_TAYLOR],
            &[ARTIST_TAYLOR, "Liz Rose"],
            (Some(40), None, None),
        ),
        row(
            SONG_SHAKE_IT_OFF,
            2014,
            ALBUM_1989,
            &[ARTIST_TAYLOR],
            &[ARTIST_TAYLOR, "Max Martin", "Shellback"],
            (Some(300), Some(20), None),
        ),
        row(
            SONG_STYLE,
            2014,
            ALBUM_1989,
            &[ARTIST_TAYLOR],
            &[ARTIST_TAYLOR, "Max Martin", "Shellback", "Ali Payami"],
            (None, Some(90), None),
        ),
        row(
            SONG_SAFE_AND_SOUND,
            2011,
            "None[Hunger Games]",
            &[ARTIST_TAYLOR, ARTIST_CIVIL_WARS],
            &[ARTIST_TAYLOR, "T Bone Burnett"],
            (None, None, Some(500)),
        ),
        row(
            SONG_EVERYTHING_HAS_CHANGED,
            2012,
            ALBUM_RED,
            &[ARTIST_TAYLOR, ARTIST_ED],
            &[ARTIST_TAYLOR, ARTIST_ED],
            (None, None, None),
        ),
        ImportSong {
            title: SONG_ECLAIR.to_string(),
            year: Some(2021),
            album: None,
            artists: vec![ARTIST_ZOE.to_string()],
            writers: vec![ARTIST_ZOE.to_string()],
            plays: ImportPlays::default(),
        },
    ]
}

/// Creates a temporary catalog database loaded with [`fixture_rows`].
/// Returns (temp_dir, catalog_db_path)
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let catalog_db_path = dir.path().join("catalog.db");

    let store = SqliteCatalogStore::new(&catalog_db_path, 1)?;
    store.import_songs(&fixture_rows())?;

    Ok((dir, catalog_db_path))
}
