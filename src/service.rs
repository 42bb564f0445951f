use crate::types::{Filter, Id, Playlist};
use actix_web::{HttpResponse, ResponseError};
use async_trait::async_trait;
use derive_more::Display;
use log::error;

/// Business side of the playlist routes.
///
/// Handlers only forward ids and filters; every lookup rule and every
/// rejection lives in the implementation.
#[async_trait]
pub trait PlaylistService: Send + Sync {
    /// Every playlist, or only those owned by `id_user`.
    async fn get_playlists(&self, id_user: Option<Id>) -> Result<Vec<Playlist>, ServiceError>;

    async fn get_playlists_by_filter(
        &self,
        id_user: Id,
        filter: &Filter,
    ) -> Result<Vec<Playlist>, ServiceError>;

    async fn get_playlist(&self, id: Id) -> Result<Playlist, ServiceError>;

    /// Appends the musica and returns the updated playlist.
    async fn add_music_to_playlist(&self, id: Id, id_musica: Id)
        -> Result<Playlist, ServiceError>;

    async fn delete_music_from_playlist(
        &self,
        id: Id,
        id_musica: Id,
    ) -> Result<Playlist, ServiceError>;
}

#[derive(Debug, Display)]
pub enum ServiceError {
    #[display(fmt = "invalid id: {}", _0)]
    InvalidId(Id),
    #[display(fmt = "playlist {} not found", _0)]
    PlaylistNotFound(i64),
    #[display(fmt = "musica {} not found", _0)]
    MusicaNotFound(i64),
    #[display(fmt = "musica {} is already in playlist {}", musica, playlist)]
    MusicaAlreadyInPlaylist { playlist: i64, musica: i64 },
    #[display(fmt = "musica {} is not in playlist {}", musica, playlist)]
    MusicaNotInPlaylist { playlist: i64, musica: i64 },
    #[display(fmt = "unknown filter: {}", _0)]
    UnknownFilter(String),
    #[display(fmt = "database failure: {}", _0)]
    Database(sqlx::Error),
}

impl ServiceError {
    /// Text safe to show to a caller, `None` for opaque failures.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Database(_) => None,
            e => Some(e.to_string()),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

// reached only by routes that don't wrap failures in an envelope
impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        error!("unhandled service error: {self}");
        HttpResponse::InternalServerError().finish()
    }
}
