//! Query and cache orchestration for the catalog read operations.

pub mod cache;
mod error;
pub mod mapper;
pub mod models;
pub mod params;
pub mod popularity;
pub mod query_builder;
mod service;

pub use cache::{CacheBackend, CacheCoordinator, InMemoryCache};
pub use error::{MappingInconsistency, QueryError};
pub use models::{Album, Artist, MonthlyPlay, Song, Writer};
pub use params::{PopularRequest, SearchRequest};
pub use service::SongsService;
