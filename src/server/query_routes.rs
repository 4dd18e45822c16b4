//! Catalog query endpoints.

use super::state::{GuardedSongsService, ServerState};
use crate::songs::{Album, PopularRequest, QueryError, SearchRequest, Song};
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            QueryError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Malformed path or query parameters are invalid arguments like any other,
/// with the same JSON error body.
fn invalid_argument(rejection: impl std::fmt::Display) -> QueryError {
    QueryError::InvalidArgument(rejection.to_string())
}

async fn get_songs_by_year(
    State(service): State<GuardedSongsService>,
    year: Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<Song>>, QueryError> {
    let Path(year) = year.map_err(invalid_argument)?;
    service.songs_by_year(year).await.map(Json)
}

async fn get_popular_songs(
    State(service): State<GuardedSongsService>,
    request: Result<Query<PopularRequest>, QueryRejection>,
) -> Result<Json<Vec<Song>>, QueryError> {
    let Query(request) = request.map_err(invalid_argument)?;
    service.popular_songs(&request).await.map(Json)
}

async fn get_popular_albums(
    State(service): State<GuardedSongsService>,
    request: Result<Query<PopularRequest>, QueryRejection>,
) -> Result<Json<Vec<Album>>, QueryError> {
    let Query(request) = request.map_err(invalid_argument)?;
    service.popular_albums(&request).await.map(Json)
}

async fn search_songs(
    State(service): State<GuardedSongsService>,
    request: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<Vec<Song>>, QueryError> {
    let Query(request) = request.map_err(invalid_argument)?;
    service.search_songs(&request).await.map(Json)
}

pub fn make_songs_routes(state: ServerState) -> Router {
    Router::new()
        .route("/songs/year/{year}", get(get_songs_by_year))
        .route("/songs/popular", get(get_popular_songs))
        .route("/songs/search", get(search_songs))
        .route("/albums/popular", get(get_popular_albums))
        .with_state(state)
}
