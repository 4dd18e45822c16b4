//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

fn query_params(params: &[(&str, Option<String>)]) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name.to_string(), v)))
        .collect()
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get_with_query(&self, path: &str, params: &[(&str, Option<String>)]) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .query(&query_params(params))
            .send()
            .await
            .expect("Request failed")
    }

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get_with_query("/", &[]).await
    }

    /// GET /v1/songs/year/{year}
    pub async fn get_songs_by_year(&self, year: i32) -> Response {
        self.get_with_query(&format!("/v1/songs/year/{}", year), &[])
            .await
    }

    /// GET /v1/songs/popular
    pub async fn get_popular_songs(&self, month: Option<&str>, limit: Option<i64>) -> Response {
        self.get_with_query(
            "/v1/songs/popular",
            &[
                ("month", month.map(str::to_string)),
                ("limit", limit.map(|l| l.to_string())),
            ],
        )
        .await
    }

    /// GET /v1/albums/popular
    pub async fn get_popular_albums(&self, month: Option<&str>, limit: Option<i64>) -> Response {
        self.get_with_query(
            "/v1/albums/popular",
            &[
                ("month", month.map(str::to_string)),
                ("limit", limit.map(|l| l.to_string())),
            ],
        )
        .await
    }

    /// GET /v1/songs/search
    pub async fn search_songs(
        &self,
        query: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Response {
        self.get_with_query(
            "/v1/songs/search",
            &[
                ("query", Some(query.to_string())),
                ("limit", limit.map(|l| l.to_string())),
                ("offset", offset.map(|o| o.to_string())),
            ],
        )
        .await
    }
}
