//! Raw request parameters, their validation into effective parameters, and
//! cache key derivation.

use super::error::QueryError;
use crate::catalog_store::Month;
use serde::Deserialize;
use std::fmt;

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_OFFSET: usize = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    SongsByYear,
    PopularSongs,
    PopularAlbums,
    SearchSongs,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::SongsByYear => "songs_by_year",
            QueryKind::PopularSongs => "popular_songs",
            QueryKind::PopularAlbums => "popular_albums",
            QueryKind::SearchSongs => "search_songs",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Raw Requests
// =============================================================================

/// Raw parameters of the popular songs and popular albums queries.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PopularRequest {
    pub month: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// Effective Parameters
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByYearParams {
    pub year: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopularParams {
    pub month: Option<Month>,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchParams {
    /// Lowercased, matching is case-insensitive.
    pub query: String,
    pub limit: usize,
    pub offset: usize,
}

fn non_negative(name: &str, value: Option<i64>, default: usize) -> Result<usize, QueryError> {
    match value {
        None => Ok(default),
        Some(v) if v < 0 => Err(QueryError::InvalidArgument(format!(
            "{} must not be negative, got {}",
            name, v
        ))),
        Some(v) => usize::try_from(v)
            .map_err(|_| QueryError::InvalidArgument(format!("{} is out of range: {}", name, v))),
    }
}

/// An empty month means no month filter.
fn parse_month(month: Option<&str>) -> Result<Option<Month>, QueryError> {
    match month.map(str::trim) {
        None | Some("") => Ok(None),
        Some(m) => m
            .parse::<Month>()
            .map(Some)
            .map_err(|e| QueryError::InvalidArgument(e.to_string())),
    }
}

impl PopularRequest {
    pub fn validate(&self) -> Result<PopularParams, QueryError> {
        Ok(PopularParams {
            month: parse_month(self.month.as_deref())?,
            limit: non_negative("limit", self.limit, DEFAULT_LIMIT)?,
        })
    }
}

impl SearchRequest {
    pub fn validate(&self) -> Result<SearchParams, QueryError> {
        Ok(SearchParams {
            query: self.query.to_lowercase(),
            limit: non_negative("limit", self.limit, DEFAULT_LIMIT)?,
            offset: non_negative("offset", self.offset, DEFAULT_OFFSET)?,
        })
    }
}

// =============================================================================
// Cache Keys
// =============================================================================

/// Deterministic cache key: `<kind>?<name>=<value>&...`, parameters sorted by
/// name and values percent-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: QueryKind,
    key: String,
}

impl CacheKey {
    pub fn derive(kind: QueryKind, params: &[(&str, String)]) -> Self {
        let mut params: Vec<&(&str, String)> = params.iter().collect();
        params.sort_by(|a, b| a.0.cmp(b.0));
        let query = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        CacheKey {
            kind,
            key: format!("{}?{}", kind.as_str(), query),
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl ByYearParams {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::derive(QueryKind::SongsByYear, &[("year", self.year.to_string())])
    }
}

impl PopularParams {
    /// Popular songs and popular albums share parameters, `kind` tells them apart.
    pub fn cache_key(&self, kind: QueryKind) -> CacheKey {
        let month = self.month.map(|m| m.to_db_str()).unwrap_or("any");
        CacheKey::derive(
            kind,
            &[
                ("month", month.to_string()),
                ("limit", self.limit.to_string()),
            ],
        )
    }
}

impl SearchParams {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::derive(
            QueryKind::SearchSongs,
            &[
                ("query", self.query.clone()),
                ("limit", self.limit.to_string()),
                ("offset", self.offset.to_string()),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_independent_of_parameter_order() {
        let a = CacheKey::derive(
            QueryKind::SearchSongs,
            &[("query", "x".to_string()), ("limit", "10".to_string())],
        );
        let b = CacheKey::derive(
            QueryKind::SearchSongs,
            &[("limit", "10".to_string()), ("query", "x".to_string())],
        );
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "search_songs?limit=10&query=x");
    }

    #[test]
    fn absent_limit_and_default_limit_share_a_key() {
        let implicit = PopularRequest {
            month: Some("june".to_string()),
            limit: None,
        };
        let explicit = PopularRequest {
            month: Some("June".to_string()),
            limit: Some(10),
        };
        assert_eq!(
            implicit.validate().unwrap().cache_key(QueryKind::PopularSongs),
            explicit.validate().unwrap().cache_key(QueryKind::PopularSongs)
        );
    }

    #[test]
    fn distinct_effective_parameters_give_distinct_keys() {
        let june = PopularParams {
            month: Some(Month::June),
            limit: 10,
        };
        let any = PopularParams {
            month: None,
            limit: 10,
        };
        assert_ne!(
            june.cache_key(QueryKind::PopularSongs),
            any.cache_key(QueryKind::PopularSongs)
        );
        assert_ne!(
            june.cache_key(QueryKind::PopularSongs),
            june.cache_key(QueryKind::PopularAlbums)
        );
        assert_eq!(
            any.cache_key(QueryKind::PopularAlbums).as_str(),
            "popular_albums?limit=10&month=any"
        );
    }

    #[test]
    fn search_values_are_percent_encoded() {
        let params = SearchRequest {
            query: "Love & Hate=1".to_string(),
            limit: None,
            offset: None,
        }
        .validate()
        .unwrap();
        assert_eq!(
            params.cache_key().as_str(),
            "search_songs?limit=10&offset=0&query=love%20%26%20hate%3D1"
        );
    }

    #[test]
    fn search_keys_ignore_query_case() {
        let upper = SearchRequest {
            query: "TEST".to_string(),
            ..Default::default()
        };
        let lower = SearchRequest {
            query: "test".to_string(),
            ..Default::default()
        };
        assert_eq!(
            upper.validate().unwrap().cache_key(),
            lower.validate().unwrap().cache_key()
        );
    }

    #[test]
    fn negative_pagination_is_rejected() {
        let err = SearchRequest {
            query: "x".to_string(),
            limit: Some(-1),
            offset: None,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));

        let err = SearchRequest {
            query: "x".to_string(),
            limit: None,
            offset: Some(-5),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));

        assert!(PopularRequest {
            month: None,
            limit: Some(-3)
        }
        .validate()
        .is_err());
    }

    #[test]
    fn unknown_month_is_rejected_and_empty_month_means_any() {
        let err = PopularRequest {
            month: Some("September".to_string()),
            limit: None,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));

        let params = PopularRequest {
            month: Some("".to_string()),
            limit: Some(0),
        }
        .validate()
        .unwrap();
        assert_eq!(params.month, None);
        assert_eq!(params.limit, 0);
    }
}
