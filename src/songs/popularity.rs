//! Album popularity: rank on a minimal join, then hydrate the winners.
//!
//! Ranking joins albums only to songs and monthly plays so that sums and
//! counts are not inflated by artist or writer fan-out. The ranked id list
//! is the only source of order, hydration order is irrelevant.

use super::error::{MappingInconsistency, QueryError};
use super::params::PopularParams;
use super::query_builder::QueryBuilder;
use crate::catalog_store::{AlbumEntity, AlbumRankRow};
use std::collections::HashMap;
use tracing::{debug, warn};

pub async fn popular_albums(
    builder: &QueryBuilder,
    params: &PopularParams,
) -> Result<Vec<AlbumEntity>, QueryError> {
    let ranked = builder.rank_albums(params).await?;
    if ranked.is_empty() {
        debug!("No albums ranked for {:?}, skipping hydration", params);
        return Ok(Vec::new());
    }

    let ids = ranked.iter().map(|row| row.album_id.clone()).collect();
    let hydrated = builder.albums_by_ids(ids).await?;
    Ok(reassemble(&ranked, hydrated))
}

/// Put hydrated albums back in ranking order. Albums missing from `hydrated`
/// or without a loaded song list are dropped with a warning.
pub fn reassemble(ranked: &[AlbumRankRow], hydrated: Vec<AlbumEntity>) -> Vec<AlbumEntity> {
    let mut by_id: HashMap<String, AlbumEntity> = hydrated
        .into_iter()
        .map(|album| (album.id.clone(), album))
        .collect();

    ranked
        .iter()
        .filter_map(|row| match check_hydrated(row, by_id.remove(&row.album_id)) {
            Ok(album) => Some(album),
            Err(inconsistency) => {
                warn!("Dropping ranked album: {}", inconsistency);
                None
            }
        })
        .collect()
}

fn check_hydrated(
    row: &AlbumRankRow,
    album: Option<AlbumEntity>,
) -> Result<AlbumEntity, MappingInconsistency> {
    let album = album.ok_or_else(|| MappingInconsistency {
        album_id: row.album_id.clone(),
        reason: "not found when hydrating",
    })?;
    if album.songs.is_none() {
        return Err(MappingInconsistency {
            album_id: row.album_id.clone(),
            reason: "songs were not loaded",
        });
    }
    Ok(album)
}
