//! End-to-end tests for the song endpoints

mod common;

use common::*;
use reqwest::StatusCode;
use swiftcloud_server::catalog_store::Month;
use swiftcloud_server::songs::Song;

fn titles(songs: &[Song]) -> Vec<&str> {
    songs.iter().map(|s| s.title.as_str()).collect()
}

#[tokio::test]
async fn test_home_reports_catalog_counts() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_home().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["catalog"]["songs"], SONG_COUNT);
    assert_eq!(body["catalog"]["monthly_plays"], MONTHLY_PLAY_COUNT);
}

#[tokio::test]
async fn test_songs_by_year_returns_fully_loaded_songs() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_songs_by_year(2008).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["cache-control"],
        format!("max-age={}", TEST_CONTENT_CACHE_AGE_SEC)
    );

    let songs: Vec<Song> = response.json().await.unwrap();
    assert_eq!(titles(&songs), vec![SONG_LOVE_STORY, SONG_WHITE_HORSE]);

    let love_story = &songs[0];
    assert_eq!(love_story.release_year, Some(2008));
    assert_eq!(love_story.album.as_ref().unwrap().title, ALBUM_FEARLESS);
    assert_eq!(love_story.artists.as_ref().unwrap()[0].name, ARTIST_TAYLOR);
    assert_eq!(love_story.writers.as_ref().unwrap().len(), 1);
    assert_eq!(love_story.monthly_plays.as_ref().unwrap().len(), 3);

    let white_horse = &songs[1];
    assert_eq!(white_horse.writers.as_ref().unwrap().len(), 2);
}

#[tokio::test]
async fn test_songs_by_year_without_matches_is_empty() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_songs_by_year(1900).await;
    assert_eq!(response.status(), StatusCode::OK);
    let songs: Vec<Song> = response.json().await.unwrap();
    assert!(songs.is_empty());
}

#[tokio::test]
async fn test_songs_by_year_rejects_non_numeric_year() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .get(format!("{}/v1/songs/year/twenty", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_song_without_album_omits_album_field() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_songs_by_year(2011).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let song = &body[0];
    assert_eq!(song["title"], SONG_SAFE_AND_SOUND);
    assert!(song.get("album").is_none());
    assert_eq!(song["artists"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_popular_songs_rank_play_rows() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_popular_songs(None, Some(3)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let songs: Vec<Song> = response.json().await.unwrap();

    assert_eq!(
        titles(&songs),
        vec![SONG_SAFE_AND_SOUND, SONG_SHAKE_IT_OFF, SONG_LOVE_STORY]
    );
    let counts: Vec<u64> = songs
        .iter()
        .map(|s| s.monthly_plays.as_ref().unwrap()[0].play_count)
        .collect();
    assert_eq!(counts, vec![500, 300, 100]);
    assert!(songs.iter().all(|s| s.writers.is_none()));
}

#[tokio::test]
async fn test_popular_songs_default_limit_lists_every_play_row() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let songs: Vec<Song> = client
        .get_popular_songs(None, None)
        .await
        .json()
        .await
        .unwrap();

    // Eight play rows, fewer than the default limit, Love Story appears per month
    assert_eq!(songs.len(), MONTHLY_PLAY_COUNT);
    let love_story_rows = songs
        .iter()
        .filter(|s| s.title == SONG_LOVE_STORY)
        .count();
    assert_eq!(love_story_rows, 3);

    let counts: Vec<u64> = songs
        .iter()
        .map(|s| s.monthly_plays.as_ref().unwrap()[0].play_count)
        .collect();
    let mut sorted = counts.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(counts, sorted);
}

#[tokio::test]
async fn test_popular_songs_filtered_by_month() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let songs: Vec<Song> = client
        .get_popular_songs(Some("july"), None)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(
        titles(&songs),
        vec![SONG_STYLE, SONG_LOVE_STORY, SONG_SHAKE_IT_OFF]
    );
    assert!(songs
        .iter()
        .all(|s| s.monthly_plays.as_ref().unwrap()[0].month == Month::July));
}

#[tokio::test]
async fn test_popular_songs_rejects_bad_arguments() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_popular_songs(Some("September"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("September"));

    let response = client.get_popular_songs(None, Some(-1)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("cache-control").is_none());
}

#[tokio::test]
async fn test_popular_songs_limit_zero_is_empty() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_popular_songs(None, Some(0)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let songs: Vec<Song> = response.json().await.unwrap();
    assert!(songs.is_empty());
}

#[tokio::test]
async fn test_search_matches_title_case_insensitively() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let songs: Vec<Song> = client
        .search_songs("SHAKE", None, None)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(titles(&songs), vec![SONG_SHAKE_IT_OFF]);
    let song = &songs[0];
    assert_eq!(song.album.as_ref().unwrap().title, ALBUM_1989);
    assert!(song.artists.is_some());
    assert!(song.writers.is_none());
    assert!(song.monthly_plays.is_none());
}

#[tokio::test]
async fn test_search_matches_artist_name() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let songs: Vec<Song> = client
        .search_songs("ed sheeran", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&songs), vec![SONG_EVERYTHING_HAS_CHANGED]);

    // Matched via a secondary artist, every artist is still listed
    let songs: Vec<Song> = client
        .search_songs("civil wars", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&songs), vec![SONG_SAFE_AND_SOUND]);
    assert_eq!(songs[0].artists.as_ref().unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for query in ["ÉCLAIR", "éclair", "zoË", "ÜNLÜ"] {
        let songs: Vec<Song> = client
            .search_songs(query, None, None)
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(titles(&songs), vec![SONG_ECLAIR], "query {:?}", query);
        assert_eq!(songs[0].artists.as_ref().unwrap()[0].name, ARTIST_ZOE);
    }
}

#[tokio::test]
async fn test_search_paginates_in_title_order() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let all: Vec<Song> = client
        .search_songs("swift", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), TAYLOR_SONG_COUNT);

    let page: Vec<Song> = client
        .search_songs("swift", Some(2), Some(2))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&page), vec![SONG_SAFE_AND_SOUND, SONG_SHAKE_IT_OFF]);

    let past_end: Vec<Song> = client
        .search_songs("swift", Some(10), Some(100))
        .await
        .json()
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let songs: Vec<Song> = client
        .search_songs("%", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert!(songs.is_empty());

    let songs: Vec<Song> = client
        .search_songs("&", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&songs), vec![SONG_SAFE_AND_SOUND]);
}

#[tokio::test]
async fn test_search_rejects_negative_paging() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search_songs("swift", None, Some(-5)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.search_songs("swift", Some(-1), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_with_empty_query_matches_everything() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let songs: Vec<Song> = client
        .search_songs("", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(songs.len(), SONG_COUNT);
    assert_eq!(songs[0].title, SONG_EVERYTHING_HAS_CHANGED);
}

#[tokio::test]
async fn test_cached_results_survive_catalog_writes() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let before: Vec<Song> = client
        .get_popular_songs(Some("August"), Some(1))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&before), vec![SONG_SAFE_AND_SOUND]);

    let love_story_id = client
        .search_songs(SONG_LOVE_STORY, None, None)
        .await
        .json::<Vec<Song>>()
        .await
        .unwrap()[0]
        .id
        .clone();
    server
        .catalog_store
        .record_monthly_play(&love_story_id, Month::August, 10_000)
        .unwrap();

    // Served from cache until the entry expires
    let after: Vec<Song> = client
        .get_popular_songs(Some("August"), Some(1))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(after, before);

    // A different key sees the write
    let fresh: Vec<Song> = client
        .get_popular_songs(Some("August"), Some(2))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&fresh)[0], SONG_LOVE_STORY);
}
