use super::cache::CacheCoordinator;
use super::error::QueryError;
use super::mapper;
use super::models::{Album, Song};
use super::params::{ByYearParams, PopularRequest, QueryKind, SearchRequest};
use super::popularity;
use super::query_builder::QueryBuilder;
use crate::catalog_store::CatalogStore;
use std::sync::Arc;
use std::time::Duration;

/// Entry point of the four catalog queries.
///
/// Requests are validated first, then served from the cache or computed
/// against the store and mapped to API value objects.
pub struct SongsService {
    builder: QueryBuilder,
    cache: CacheCoordinator,
}

impl SongsService {
    pub fn new(store: Arc<dyn CatalogStore>, cache: CacheCoordinator, store_timeout: Duration) -> Self {
        SongsService {
            builder: QueryBuilder::new(store, store_timeout),
            cache,
        }
    }

    /// Songs released in `year`, ordered by title, with every relation loaded.
    pub async fn songs_by_year(&self, year: i32) -> Result<Vec<Song>, QueryError> {
        let params = ByYearParams { year };
        self.cache
            .get_or_compute(&params.cache_key(), || async {
                let songs = self.builder.songs_by_year(&params).await?;
                Ok::<_, QueryError>(mapper::to_songs(&songs))
            })
            .await
    }

    /// Monthly play rows ranked by play count. A song appears once per
    /// ranked row, carrying only that row in `monthlyPlays`.
    pub async fn popular_songs(&self, request: &PopularRequest) -> Result<Vec<Song>, QueryError> {
        let params = request.validate()?;
        self.cache
            .get_or_compute(&params.cache_key(QueryKind::PopularSongs), || async {
                let songs = self.builder.popular_song_rows(&params).await?;
                Ok::<_, QueryError>(mapper::to_songs(&songs))
            })
            .await
    }

    pub async fn popular_albums(&self, request: &PopularRequest) -> Result<Vec<Album>, QueryError> {
        let params = request.validate()?;
        self.cache
            .get_or_compute(&params.cache_key(QueryKind::PopularAlbums), || async {
                let albums = popularity::popular_albums(&self.builder, &params).await?;
                Ok::<_, QueryError>(albums.iter().map(mapper::to_album).collect::<Vec<_>>())
            })
            .await
    }

    /// Case-insensitive substring search over song titles and artist names.
    pub async fn search_songs(&self, request: &SearchRequest) -> Result<Vec<Song>, QueryError> {
        let params = request.validate()?;
        self.cache
            .get_or_compute(&params.cache_key(), || async {
                let songs = self.builder.search_songs(&params).await?;
                Ok::<_, QueryError>(mapper::to_songs(&songs))
            })
            .await
    }
}
