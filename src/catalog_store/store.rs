//! SQLite-backed catalog store implementation.
//!
//! Reads go through a small pool of read-only connections (round-robin,
//! WAL mode), writes through a single write connection.

use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::{
    AlbumRankQuery, CatalogStore, PlayRankQuery, SongFilter, SongFind, SongRelations,
};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{
    functions::FunctionFlags, params, params_from_iter, types::Type, types::Value, Connection,
    OptionalExtension, Row,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const SONG_COLUMNS: &str =
    "s.rowid, s.id, s.title, s.release_year, s.album_rowid, s.created_at, s.updated_at";
const MONTHLY_PLAY_COLUMNS: &str =
    "mp.rowid, mp.id, mp.song_rowid, mp.month, mp.play_count, mp.created_at, mp.updated_at";

/// Upper bound of bound parameters in a single `IN (...)` list.
const MAX_IN_PARAMS: usize = 500;

/// SQLite-backed catalog store.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

/// Name of the SQL function folding text to lowercase over all of Unicode.
/// The builtin `LOWER` only folds ASCII.
const UNICODE_LOWER: &str = "unicode_lower";

fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )
    .context("Failed to register unicode_lower")
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let latest_schema = CATALOG_VERSIONED_SCHEMAS
        .last()
        .context("No catalog schema defined")?;

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!(
            "Creating catalog db schema at version {}",
            latest_schema.version
        );
        let tx = conn.transaction()?;
        latest_schema.create(&tx)?;
        tx.commit()?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let expected_version = (BASE_DB_VERSION + latest_schema.version) as i64;
    if db_version != expected_version {
        bail!(
            "Catalog db is at version {}, this server expects {}",
            db_version,
            expected_version
        );
    }
    latest_schema.validate(conn)
}

impl SqliteCatalogStore {
    /// Open (creating if needed) the catalog database at `db_path`.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `read_pool_size` - Number of connections for concurrent reads, at least 1
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path_ref))?;

        write_conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate_if_needed(&mut write_conn)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            register_functions(&read_conn)?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        let store = SqliteCatalogStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        };

        let counts = store.get_counts()?;
        info!(
            "Opened catalog: {} songs, {} albums, {} artists, {} writers, {} monthly plays",
            counts.songs, counts.albums, counts.artists, counts.writers, counts.monthly_plays
        );

        Ok(store)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        let conn = self.read_pool[index]
            .lock()
            .map_err(|_| anyhow!("Catalog read connection lock poisoned"))?;
        f(&conn)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .write_conn
            .lock()
            .map_err(|_| anyhow!("Catalog write connection lock poisoned"))?;
        f(&mut conn)
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Import catalog rows in a single transaction.
    ///
    /// Artists and writers are matched by name, albums by title, so importing
    /// the same rows twice only duplicates songs.
    pub fn import_songs(&self, songs: &[ImportSong]) -> Result<ImportStats> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            let mut stats = ImportStats::default();
            let mut artists: HashMap<String, i64> = HashMap::new();
            let mut writers: HashMap<String, i64> = HashMap::new();
            let mut albums: HashMap<String, i64> = HashMap::new();

            for song in songs {
                let album_rowid = match normalize_album_title(song.album.as_deref()) {
                    Some(title) => Some(get_or_create_album(&tx, title, &mut albums, &mut stats)?),
                    None => None,
                };

                let song_rowid = insert_song(&tx, &song.title, song.year, album_rowid)?;
                stats.songs_created += 1;

                for name in song.artists.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
                    let artist_rowid = get_or_create_named(
                        &tx,
                        "artists",
                        name,
                        &mut artists,
                        &mut stats.artists_created,
                    )?;
                    tx.execute(
                        "INSERT OR IGNORE INTO song_artists (song_rowid, artist_rowid) VALUES (?1, ?2)",
                        params![song_rowid, artist_rowid],
                    )?;
                }

                for name in song.writers.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
                    let writer_rowid = get_or_create_named(
                        &tx,
                        "writers",
                        name,
                        &mut writers,
                        &mut stats.writers_created,
                    )?;
                    tx.execute(
                        "INSERT OR IGNORE INTO song_writers (song_rowid, writer_rowid) VALUES (?1, ?2)",
                        params![song_rowid, writer_rowid],
                    )?;
                }

                for (month, play_count) in song.plays.iter() {
                    upsert_monthly_play(&tx, song_rowid, month, play_count)?;
                    stats.plays_recorded += 1;
                }
            }

            tx.commit()?;
            Ok(stats)
        })
    }

    /// Set the play count of a song for a month, creating the row if needed.
    pub fn record_monthly_play(&self, song_id: &str, month: Month, play_count: u64) -> Result<()> {
        self.write(|conn| {
            let song_rowid: i64 = conn
                .query_row(
                    "SELECT rowid FROM songs WHERE id = ?1",
                    params![song_id],
                    |r| r.get(0),
                )
                .optional()?
                .ok_or_else(|| anyhow!("Song {} not found", song_id))?;
            upsert_monthly_play(conn, song_rowid, month, play_count)
        })
    }
}

// =============================================================================
// Write Helpers
// =============================================================================

/// `None`, `"None"` and `"None[...]"` all mean the song is not on an album.
fn normalize_album_title(title: Option<&str>) -> Option<&str> {
    let title = title?.trim();
    if title.is_empty() || title == "None" || title.starts_with("None[") {
        None
    } else {
        Some(title)
    }
}

fn get_or_create_named(
    conn: &Connection,
    table: &'static str,
    name: &str,
    cache: &mut HashMap<String, i64>,
    created: &mut usize,
) -> Result<i64> {
    if let Some(rowid) = cache.get(name) {
        return Ok(*rowid);
    }
    let existing: Option<i64> = conn
        .query_row(
            &format!("SELECT rowid FROM {} WHERE name = ?1", table),
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    let rowid = match existing {
        Some(rowid) => rowid,
        None => {
            conn.execute(
                &format!("INSERT INTO {} (id, name) VALUES (?1, ?2)", table),
                params![uuid::Uuid::new_v4().to_string(), name],
            )?;
            *created += 1;
            conn.last_insert_rowid()
        }
    };
    cache.insert(name.to_string(), rowid);
    Ok(rowid)
}

fn get_or_create_album(
    conn: &Connection,
    title: &str,
    cache: &mut HashMap<String, i64>,
    stats: &mut ImportStats,
) -> Result<i64> {
    if let Some(rowid) = cache.get(title) {
        return Ok(*rowid);
    }
    let existing: Option<i64> = conn
        .query_row(
            "SELECT rowid FROM albums WHERE title = ?1 ORDER BY rowid LIMIT 1",
            params![title],
            |r| r.get(0),
        )
        .optional()?;
    let rowid = match existing {
        Some(rowid) => rowid,
        None => {
            conn.execute(
                "INSERT INTO albums (id, title) VALUES (?1, ?2)",
                params![uuid::Uuid::new_v4().to_string(), title],
            )?;
            stats.albums_created += 1;
            conn.last_insert_rowid()
        }
    };
    cache.insert(title.to_string(), rowid);
    Ok(rowid)
}

fn insert_song(
    conn: &Connection,
    title: &str,
    release_year: Option<i32>,
    album_rowid: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO songs (id, title, release_year, album_rowid) VALUES (?1, ?2, ?3, ?4)",
        params![
            uuid::Uuid::new_v4().to_string(),
            title,
            release_year,
            album_rowid
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn upsert_monthly_play(
    conn: &Connection,
    song_rowid: i64,
    month: Month,
    play_count: u64,
) -> Result<()> {
    let play_count = i64::try_from(play_count).context("Play count out of range")?;
    conn.execute(
        "INSERT INTO monthly_plays (id, song_rowid, month, play_count) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(song_rowid, month) DO UPDATE SET
            play_count = excluded.play_count,
            updated_at = cast(strftime('%s','now') as int)",
        params![
            uuid::Uuid::new_v4().to_string(),
            song_rowid,
            month.to_db_str(),
            play_count
        ],
    )?;
    Ok(())
}

// =============================================================================
// Row Parsing
// =============================================================================

fn parse_song_row(row: &Row) -> rusqlite::Result<SongEntity> {
    Ok(SongEntity {
        rowid: row.get(0)?,
        id: row.get(1)?,
        title: row.get(2)?,
        release_year: row.get(3)?,
        album_rowid: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        artists: None,
        writers: None,
        album: None,
        monthly_plays: None,
    })
}

/// Parse the `MONTHLY_PLAY_COLUMNS` starting at column `offset`.
fn parse_monthly_play(row: &Row, offset: usize) -> rusqlite::Result<MonthlyPlayEntity> {
    let month_str: String = row.get(offset + 3)?;
    let month = Month::from_db_str(&month_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            offset + 3,
            Type::Text,
            Box::new(UnknownMonth(month_str.clone())),
        )
    })?;
    let play_count: i64 = row.get(offset + 4)?;
    Ok(MonthlyPlayEntity {
        rowid: row.get(offset)?,
        id: row.get(offset + 1)?,
        song_rowid: row.get(offset + 2)?,
        month,
        play_count: u64::try_from(play_count).unwrap_or(0),
        created_at: row.get(offset + 5)?,
        updated_at: row.get(offset + 6)?,
    })
}

fn parse_album_row(row: &Row) -> rusqlite::Result<AlbumEntity> {
    Ok(AlbumEntity {
        rowid: row.get(0)?,
        id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        songs: None,
    })
}

// =============================================================================
// Relation Loading
// =============================================================================

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Lowercased `%needle%` with LIKE wildcards escaped by `\`.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Run `sql_template` (with a `{}` for the IN list) over `keys` in chunks and
/// group the parsed `(key, item)` pairs by key, keeping row order.
fn load_grouped<K, T>(
    conn: &Connection,
    sql_template: &str,
    keys: &[K],
    parse: impl Fn(&Row) -> rusqlite::Result<(i64, T)>,
) -> Result<HashMap<i64, Vec<T>>>
where
    K: rusqlite::ToSql,
{
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for chunk in keys.chunks(MAX_IN_PARAMS) {
        let sql = sql_template.replacen("{}", &placeholders(chunk.len()), 1);
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |r| parse(r))?;
        for row in rows {
            let (key, item) = row?;
            grouped.entry(key).or_default().push(item);
        }
    }
    Ok(grouped)
}

fn unique_rowids(rowids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    rowids.filter(|rowid| seen.insert(*rowid)).collect()
}

fn load_song_artists(conn: &Connection, song_rowids: &[i64]) -> Result<HashMap<i64, Vec<ArtistEntity>>> {
    load_grouped(
        conn,
        "SELECT sa.song_rowid, a.rowid, a.id, a.name, a.created_at, a.updated_at
         FROM song_artists sa JOIN artists a ON a.rowid = sa.artist_rowid
         WHERE sa.song_rowid IN ({})
         ORDER BY a.name ASC, a.rowid ASC",
        song_rowids,
        |r| {
            Ok((
                r.get(0)?,
                ArtistEntity {
                    rowid: r.get(1)?,
                    id: r.get(2)?,
                    name: r.get(3)?,
                    created_at: r.get(4)?,
                    updated_at: r.get(5)?,
                },
            ))
        },
    )
}

fn load_song_writers(conn: &Connection, song_rowids: &[i64]) -> Result<HashMap<i64, Vec<WriterEntity>>> {
    load_grouped(
        conn,
        "SELECT sw.song_rowid, w.rowid, w.id, w.name, w.created_at, w.updated_at
         FROM song_writers sw JOIN writers w ON w.rowid = sw.writer_rowid
         WHERE sw.song_rowid IN ({})
         ORDER BY w.name ASC, w.rowid ASC",
        song_rowids,
        |r| {
            Ok((
                r.get(0)?,
                WriterEntity {
                    rowid: r.get(1)?,
                    id: r.get(2)?,
                    name: r.get(3)?,
                    created_at: r.get(4)?,
                    updated_at: r.get(5)?,
                },
            ))
        },
    )
}

fn load_monthly_plays(
    conn: &Connection,
    song_rowids: &[i64],
) -> Result<HashMap<i64, Vec<MonthlyPlayEntity>>> {
    let mut grouped = load_grouped(
        conn,
        &format!(
            "SELECT mp.song_rowid, {} FROM monthly_plays mp WHERE mp.song_rowid IN ({{}})",
            MONTHLY_PLAY_COLUMNS
        ),
        song_rowids,
        |r| Ok((r.get(0)?, parse_monthly_play(r, 1)?)),
    )?;
    for plays in grouped.values_mut() {
        plays.sort_by_key(|p| p.month);
    }
    Ok(grouped)
}

fn load_albums_by_rowid(conn: &Connection, album_rowids: &[i64]) -> Result<HashMap<i64, AlbumEntity>> {
    let grouped = load_grouped(
        conn,
        "SELECT rowid, id, title, created_at, updated_at FROM albums WHERE rowid IN ({})",
        album_rowids,
        |r| Ok((r.get(0)?, parse_album_row(r)?)),
    )?;
    Ok(grouped
        .into_iter()
        .filter_map(|(rowid, mut albums)| albums.pop().map(|album| (rowid, album)))
        .collect())
}

/// Attach the requested relations to `songs`. Relations already present are
/// left untouched.
fn hydrate_songs(
    conn: &Connection,
    mut songs: Vec<SongEntity>,
    relations: &SongRelations,
) -> Result<Vec<SongEntity>> {
    if songs.is_empty() {
        return Ok(songs);
    }
    let song_rowids = unique_rowids(songs.iter().map(|s| s.rowid));

    if relations.artists {
        let artists = load_song_artists(conn, &song_rowids)?;
        for song in songs.iter_mut().filter(|s| s.artists.is_none()) {
            song.artists = Some(artists.get(&song.rowid).cloned().unwrap_or_default());
        }
    }

    if relations.writers {
        let writers = load_song_writers(conn, &song_rowids)?;
        for song in songs.iter_mut().filter(|s| s.writers.is_none()) {
            song.writers = Some(writers.get(&song.rowid).cloned().unwrap_or_default());
        }
    }

    if relations.monthly_plays {
        let plays = load_monthly_plays(conn, &song_rowids)?;
        for song in songs.iter_mut().filter(|s| s.monthly_plays.is_none()) {
            song.monthly_plays = Some(plays.get(&song.rowid).cloned().unwrap_or_default());
        }
    }

    if relations.album {
        let album_rowids = unique_rowids(songs.iter().filter_map(|s| s.album_rowid));
        let albums = load_albums_by_rowid(conn, &album_rowids)?;
        for song in songs.iter_mut().filter(|s| s.album.is_none()) {
            song.album = song.album_rowid.and_then(|rowid| albums.get(&rowid).cloned());
        }
    }

    Ok(songs)
}

// =============================================================================
// CatalogStore Implementation
// =============================================================================

impl CatalogStore for SqliteCatalogStore {
    fn find_songs(&self, find: &SongFind) -> Result<Vec<SongEntity>> {
        let mut sql = format!("SELECT {} FROM songs s WHERE ", SONG_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        match &find.filter {
            SongFilter::ReleaseYear(year) => {
                sql.push_str("s.release_year = ?");
                values.push(Value::Integer(i64::from(*year)));
            }
            SongFilter::TitleOrArtistContains(needle) => {
                sql.push_str(
                    "(unicode_lower(s.title) LIKE ? ESCAPE '\\'
                      OR EXISTS (
                        SELECT 1 FROM song_artists sa JOIN artists a ON a.rowid = sa.artist_rowid
                        WHERE sa.song_rowid = s.rowid AND unicode_lower(a.name) LIKE ? ESCAPE '\\'))",
                );
                let pattern = like_pattern(needle);
                values.push(Value::Text(pattern.clone()));
                values.push(Value::Text(pattern));
            }
        }

        sql.push_str(" ORDER BY s.title ASC, s.rowid ASC");
        if let Some(page) = find.page {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::Integer(page.limit as i64));
            values.push(Value::Integer(page.offset as i64));
        }

        debug!("find_songs {:?}", find.filter);
        self.read(|conn| {
            let songs = {
                let mut stmt = conn.prepare_cached(&sql)?;
                let rows = stmt.query_map(params_from_iter(values.iter()), parse_song_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            hydrate_songs(conn, songs, &find.relations)
        })
    }

    fn find_song_play_rows(&self, query: &PlayRankQuery) -> Result<Vec<SongEntity>> {
        let mut sql = format!(
            "SELECT {}, {} FROM songs s JOIN monthly_plays mp ON mp.song_rowid = s.rowid",
            SONG_COLUMNS, MONTHLY_PLAY_COLUMNS
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(month) = query.month {
            sql.push_str(" WHERE mp.month = ?");
            values.push(Value::Text(month.to_db_str().to_string()));
        }
        sql.push_str(
            " ORDER BY mp.play_count DESC, s.title ASC, s.rowid ASC, mp.rowid ASC LIMIT ?",
        );
        values.push(Value::Integer(query.limit as i64));

        // The ranked play row is the song's monthly_plays, never the full set.
        let relations = SongRelations {
            monthly_plays: false,
            ..query.relations
        };

        self.read(|conn| {
            let songs = {
                let mut stmt = conn.prepare_cached(&sql)?;
                let rows = stmt.query_map(params_from_iter(values.iter()), |r| {
                    let mut song = parse_song_row(r)?;
                    song.monthly_plays = Some(vec![parse_monthly_play(r, 7)?]);
                    Ok(song)
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            hydrate_songs(conn, songs, &relations)
        })
    }

    fn rank_albums(&self, query: &AlbumRankQuery) -> Result<Vec<AlbumRankRow>> {
        let mut sql = String::from(
            "SELECT al.id, al.title,
                    COUNT(DISTINCT s.rowid) AS songs_count,
                    COALESCE(SUM(mp.play_count), 0) AS total_plays
             FROM albums al
             LEFT JOIN songs s ON s.album_rowid = al.rowid
             LEFT JOIN monthly_plays mp ON mp.song_rowid = s.rowid",
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(month) = query.month {
            sql.push_str(" WHERE mp.month = ?");
            values.push(Value::Text(month.to_db_str().to_string()));
        }
        sql.push_str(
            " GROUP BY al.rowid, al.id, al.title
              HAVING COUNT(DISTINCT s.rowid) > 0
              ORDER BY total_plays DESC, al.title ASC, al.rowid ASC
              LIMIT ?",
        );
        values.push(Value::Integer(query.limit as i64));

        self.read(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), |r| {
                let songs_count: i64 = r.get(2)?;
                let total_plays: i64 = r.get(3)?;
                Ok(AlbumRankRow {
                    album_id: r.get(0)?,
                    title: r.get(1)?,
                    songs_count: u64::try_from(songs_count).unwrap_or(0),
                    total_plays: u64::try_from(total_plays).unwrap_or(0),
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    fn find_albums_by_ids(
        &self,
        ids: &[String],
        song_relations: &SongRelations,
    ) -> Result<Vec<AlbumEntity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // Songs hang off the album here, loading the album again per song would cycle.
        let song_relations = SongRelations {
            album: false,
            ..*song_relations
        };

        self.read(|conn| {
            let mut albums: Vec<AlbumEntity> = load_grouped(
                conn,
                "SELECT rowid, id, title, created_at, updated_at FROM albums WHERE id IN ({})",
                ids,
                |r| Ok((r.get(0)?, parse_album_row(r)?)),
            )?
            .into_values()
            .flatten()
            .collect();

            let album_rowids: Vec<i64> = albums.iter().map(|a| a.rowid).collect();
            let songs_by_album = load_grouped(
                conn,
                &format!(
                    "SELECT s.album_rowid, {} FROM songs s WHERE s.album_rowid IN ({{}})
                     ORDER BY s.title ASC, s.rowid ASC",
                    SONG_COLUMNS
                ),
                &album_rowids,
                |r| {
                    let album_rowid: i64 = r.get(0)?;
                    // Shift by one: the leading column is the grouping key.
                    Ok((
                        album_rowid,
                        SongEntity {
                            rowid: r.get(1)?,
                            id: r.get(2)?,
                            title: r.get(3)?,
                            release_year: r.get(4)?,
                            album_rowid: r.get(5)?,
                            created_at: r.get(6)?,
                            updated_at: r.get(7)?,
                            artists: None,
                            writers: None,
                            album: None,
                            monthly_plays: None,
                        },
                    ))
                },
            )?;

            // One hydration pass over the songs of every album, then regroup.
            let songs = songs_by_album.into_values().flatten().collect();
            let mut hydrated: HashMap<i64, Vec<SongEntity>> = HashMap::new();
            for song in hydrate_songs(conn, songs, &song_relations)? {
                if let Some(album_rowid) = song.album_rowid {
                    hydrated.entry(album_rowid).or_default().push(song);
                }
            }

            for album in albums.iter_mut() {
                album.songs = Some(hydrated.remove(&album.rowid).unwrap_or_default());
            }
            Ok(albums)
        })
    }

    fn get_counts(&self) -> Result<CatalogCounts> {
        self.read(|conn| {
            let count = |table: &str| -> Result<usize> {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
                        r.get(0)
                    })?;
                Ok(n as usize)
            };
            Ok(CatalogCounts {
                artists: count("artists")?,
                writers: count("writers")?,
                albums: count("albums")?,
                songs: count("songs")?,
                monthly_plays: count("monthly_plays")?,
            })
        })
    }
}
