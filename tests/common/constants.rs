//! Shared constants for end-to-end tests
//!
//! When the fixture catalog changes, update only this file and
//! `fixtures.rs`.

// ============================================================================
// Fixture Catalog
// ============================================================================

pub const ARTIST_TAYLOR: &str = "Taylor Swift";
pub const ARTIST_ED: &str = "Ed Sheeran";
pub const ARTIST_CIVIL_WARS: &str = "The Civil Wars";
pub const ARTIST_ZOE: &str = "Zoë Ünlü";

pub const ALBUM_FEARLESS: &str = "Fearless";
pub const ALBUM_1989: &str = "1989";
pub const ALBUM_RED: &str = "Red";

pub const SONG_LOVE_STORY: &str = "Love Story";
pub const SONG_WHITE_HORSE: &str = "White Horse";
pub const SONG_SHAKE_IT_OFF: &str = "Shake It Off";
pub const SONG_STYLE: &str = "Style";
pub const SONG_SAFE_AND_SOUND: &str = "Safe & Sound";
pub const SONG_EVERYTHING_HAS_CHANGED: &str = "Everything Has Changed";
pub const SONG_ECLAIR: &str = "Éclair";

/// Total number of songs in the fixture catalog
pub const SONG_COUNT: usize = 7;

/// Number of songs credited to Taylor Swift
pub const TAYLOR_SONG_COUNT: usize = 6;

/// Number of monthly play rows in the fixture catalog
pub const MONTHLY_PLAY_COUNT: usize = 8;

// ============================================================================
// Timeouts
// ============================================================================

/// Per-request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Max time to wait for a spawned server to answer
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness probes
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Cache-Control max-age configured on the test server
pub const TEST_CONTENT_CACHE_AGE_SEC: usize = 60;
