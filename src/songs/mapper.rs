//! Relational entity to API value object conversion.
//!
//! Every function is total: row ids and foreign keys are dropped, present
//! relations are mapped recursively and absent relations stay absent.

use super::models::{Album, Artist, MonthlyPlay, Song, Writer};
use crate::catalog_store::{
    AlbumEntity, ArtistEntity, MonthlyPlayEntity, SongEntity, WriterEntity,
};
use chrono::{DateTime, Utc};

/// Unix seconds to UTC. Out of range values clamp to the epoch.
fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

pub fn to_artist(entity: &ArtistEntity) -> Artist {
    Artist {
        id: entity.id.clone(),
        name: entity.name.clone(),
        created_at: timestamp(entity.created_at),
        updated_at: timestamp(entity.updated_at),
    }
}

pub fn to_writer(entity: &WriterEntity) -> Writer {
    Writer {
        id: entity.id.clone(),
        name: entity.name.clone(),
        created_at: timestamp(entity.created_at),
        updated_at: timestamp(entity.updated_at),
    }
}

pub fn to_monthly_play(entity: &MonthlyPlayEntity) -> MonthlyPlay {
    MonthlyPlay {
        id: entity.id.clone(),
        month: entity.month,
        play_count: entity.play_count,
        created_at: timestamp(entity.created_at),
        updated_at: timestamp(entity.updated_at),
    }
}

pub fn to_album(entity: &AlbumEntity) -> Album {
    Album {
        id: entity.id.clone(),
        title: entity.title.clone(),
        songs: entity
            .songs
            .as_ref()
            .map(|songs| songs.iter().map(to_song).collect()),
        created_at: timestamp(entity.created_at),
        updated_at: timestamp(entity.updated_at),
    }
}

pub fn to_song(entity: &SongEntity) -> Song {
    Song {
        id: entity.id.clone(),
        title: entity.title.clone(),
        release_year: entity.release_year,
        album: entity.album.as_ref().map(|album| Box::new(to_album(album))),
        artists: entity
            .artists
            .as_ref()
            .map(|artists| artists.iter().map(to_artist).collect()),
        writers: entity
            .writers
            .as_ref()
            .map(|writers| writers.iter().map(to_writer).collect()),
        monthly_plays: entity
            .monthly_plays
            .as_ref()
            .map(|plays| plays.iter().map(to_monthly_play).collect()),
        created_at: timestamp(entity.created_at),
        updated_at: timestamp(entity.updated_at),
    }
}

pub fn to_songs(entities: &[SongEntity]) -> Vec<Song> {
    entities.iter().map(to_song).collect()
}
