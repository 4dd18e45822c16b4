//! The four read shapes as explicit store query specifications.
//!
//! Every store call runs on the blocking pool and is bounded by the store
//! timeout. On timeout the blocking call is abandoned and its result dropped.

use super::error::QueryError;
use super::params::{ByYearParams, PopularParams, SearchParams};
use crate::catalog_store::{
    AlbumEntity, AlbumRankQuery, AlbumRankRow, CatalogStore, Page, PlayRankQuery, SongEntity,
    SongFilter, SongFind, SongRelations,
};
use crate::server::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Relations loaded for each song of an album in the popular albums result.
pub const POPULAR_ALBUM_SONG_RELATIONS: SongRelations = SongRelations {
    artists: true,
    writers: true,
    album: false,
    monthly_plays: true,
};

pub fn by_year_find(params: &ByYearParams) -> SongFind {
    SongFind {
        filter: SongFilter::ReleaseYear(params.year),
        relations: SongRelations::ALL,
        page: None,
    }
}

pub fn popular_songs_query(params: &PopularParams) -> PlayRankQuery {
    PlayRankQuery {
        month: params.month,
        limit: params.limit,
        relations: SongRelations {
            artists: true,
            writers: false,
            album: true,
            monthly_plays: true,
        },
    }
}

pub fn album_rank_query(params: &PopularParams) -> AlbumRankQuery {
    AlbumRankQuery {
        month: params.month,
        limit: params.limit,
    }
}

pub fn search_find(params: &SearchParams) -> SongFind {
    SongFind {
        filter: SongFilter::TitleOrArtistContains(params.query.clone()),
        relations: SongRelations {
            artists: true,
            writers: false,
            album: true,
            monthly_plays: false,
        },
        page: Some(Page {
            limit: params.limit,
            offset: params.offset,
        }),
    }
}

#[derive(Clone)]
pub struct QueryBuilder {
    store: Arc<dyn CatalogStore>,
    timeout: Duration,
}

fn record_failure(operation: &'static str, err: QueryError) -> QueryError {
    metrics::record_store_error(operation, err.kind());
    err
}

impl QueryBuilder {
    pub fn new(store: Arc<dyn CatalogStore>, timeout: Duration) -> Self {
        QueryBuilder { store, timeout }
    }

    async fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T, QueryError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CatalogStore) -> anyhow::Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        let start = Instant::now();
        let task = tokio::task::spawn_blocking(move || f(store.as_ref()));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(value))) => {
                let elapsed = start.elapsed();
                debug!("{} completed in {:?}", operation, elapsed);
                metrics::record_store_query(operation, elapsed);
                Ok(value)
            }
            Ok(Ok(Err(err))) => {
                error!("{} failed: {:#}", operation, err);
                Err(record_failure(
                    operation,
                    QueryError::StoreUnavailable(format!("{:#}", err)),
                ))
            }
            Ok(Err(join_err)) => {
                error!("{} task failed: {}", operation, join_err);
                Err(record_failure(
                    operation,
                    QueryError::StoreUnavailable(format!("{} did not complete", operation)),
                ))
            }
            Err(_) => {
                error!("{} timed out after {:?}", operation, self.timeout);
                Err(record_failure(
                    operation,
                    QueryError::Timeout {
                        operation,
                        after: self.timeout,
                    },
                ))
            }
        }
    }

    pub async fn songs_by_year(&self, params: &ByYearParams) -> Result<Vec<SongEntity>, QueryError> {
        let find = by_year_find(params);
        self.run("songs_by_year", move |store| store.find_songs(&find))
            .await
    }

    /// One result per monthly play row, not deduplicated by song.
    pub async fn popular_song_rows(
        &self,
        params: &PopularParams,
    ) -> Result<Vec<SongEntity>, QueryError> {
        let query = popular_songs_query(params);
        self.run("popular_songs", move |store| {
            store.find_song_play_rows(&query)
        })
        .await
    }

    pub async fn rank_albums(&self, params: &PopularParams) -> Result<Vec<AlbumRankRow>, QueryError> {
        let query = album_rank_query(params);
        self.run("rank_albums", move |store| store.rank_albums(&query))
            .await
    }

    pub async fn albums_by_ids(&self, ids: Vec<String>) -> Result<Vec<AlbumEntity>, QueryError> {
        self.run("albums_by_ids", move |store| {
            store.find_albums_by_ids(&ids, &POPULAR_ALBUM_SONG_RELATIONS)
        })
        .await
    }

    pub async fn search_songs(&self, params: &SearchParams) -> Result<Vec<SongEntity>, QueryError> {
        let find = search_find(params);
        self.run("search_songs", move |store| store.find_songs(&find))
            .await
    }
}
