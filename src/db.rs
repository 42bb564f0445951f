use crate::service::{PlaylistService, ServiceError};
use crate::types::{Filter, Id, Musica, Playlist};
use anyhow::Context;
use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::fs;
use std::time::Duration;

const SCHEMA: &str = include_str!("../migrations/init.sql");

const PLAYLIST_COLUMNS: &str = "select p.id, p.id_user, p.name, p.description from playlist p";

pub(crate) struct Database(SqlitePool);

#[derive(FromRow)]
struct PlaylistRow {
    id: i64,
    id_user: i64,
    name: String,
    description: Option<String>,
}

/// Initial content loaded into an empty database.
#[derive(Debug, Deserialize)]
pub(crate) struct Seed {
    #[serde(default)]
    pub musicas: Vec<Musica>,
    #[serde(default)]
    pub playlists: Vec<Playlist>,
}

impl Seed {
    pub(crate) fn from_file(path: &str) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path).with_context(|| format!("reading seed {path}"))?;
        Ok(serde_json::from_str(&data)?)
    }
}

fn key(id: Id) -> Result<i64, ServiceError> {
    id.as_integer().ok_or(ServiceError::InvalidId(id))
}

impl Database {
    pub(crate) async fn connect(
        uri: &str,
        retries: u32,
        delay: Duration,
    ) -> Result<Self, sqlx::Error> {
        let retries = retries.max(1);
        let mut attempt = 1;
        loop {
            match Self::try_connect(uri).await {
                Ok(pool) => {
                    let db = Self(pool);
                    db.migrate().await?;
                    info!("connected to {uri}");
                    return Ok(db);
                }
                Err(e) if attempt < retries => {
                    info!("Failed to connect to {uri} due to {e}, retrying [{attempt}/{retries}]")
                }
                Err(e) => {
                    error!("could not acquire database after {retries} attempts");
                    return Err(e);
                }
            }
            attempt += 1;
            actix_web::rt::time::sleep(delay).await;
        }
    }

    #[cfg(test)]
    pub(crate) async fn in_memory() -> Result<Self, sqlx::Error> {
        Self::connect("sqlite::memory:", 1, Duration::ZERO).await
    }

    async fn try_connect(uri: &str) -> Result<SqlitePool, sqlx::Error> {
        let options = uri.parse::<SqliteConnectOptions>()?.create_if_missing(true);
        // every connection to an in-memory database sees its own empty database
        let in_memory = uri.contains(":memory:") || uri.contains("mode=memory");
        SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .min_connections(if in_memory { 1 } else { 0 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.0).await?;
        Ok(())
    }

    /// Loads `seed` unless some playlist already exists.
    pub(crate) async fn seed(&self, seed: Seed) -> Result<(), sqlx::Error> {
        let mut tx = self.0.begin().await?;
        let existing = sqlx::query_scalar::<_, i64>("select count(*) from playlist")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            info!("database already holds {existing} playlists, skipping seed");
            return Ok(());
        }
        let loose = seed.musicas.iter();
        let listed = seed.playlists.iter().flat_map(|p| p.musicas.iter());
        for m in loose.chain(listed) {
            sqlx::query(
                "insert or ignore into musica (id, name, artist, album, duration) values (?, ?, ?, ?, ?)",
            )
            .bind(m.id)
            .bind(&m.name)
            .bind(&m.artist)
            .bind(&m.album)
            .bind(m.duration)
            .execute(&mut *tx)
            .await?;
        }
        for p in &seed.playlists {
            sqlx::query("insert into playlist (id, id_user, name, description) values (?, ?, ?, ?)")
                .bind(p.id)
                .bind(p.id_user)
                .bind(&p.name)
                .bind(&p.description)
                .execute(&mut *tx)
                .await?;
            for (position, m) in p.musicas.iter().enumerate() {
                sqlx::query(
                    "insert into playlist_musica (id_playlist, id_musica, position) values (?, ?, ?)",
                )
                .bind(p.id)
                .bind(m.id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        info!(
            "seeded {} playlists and {} loose musicas",
            seed.playlists.len(),
            seed.musicas.len()
        );
        Ok(())
    }

    async fn musicas(&self, id_playlist: i64) -> Result<Vec<Musica>, sqlx::Error> {
        sqlx::query_as::<_, Musica>(
            "select m.id, m.name, m.artist, m.album, m.duration from musica m \
             join playlist_musica pm on pm.id_musica = m.id \
             where pm.id_playlist = ? order by pm.position",
        )
        .bind(id_playlist)
        .fetch_all(&self.0)
        .await
    }

    async fn hydrate(&self, row: PlaylistRow) -> Result<Playlist, sqlx::Error> {
        let musicas = self.musicas(row.id).await?;
        Ok(Playlist {
            id: row.id,
            id_user: row.id_user,
            name: row.name,
            description: row.description,
            musicas,
        })
    }

    async fn hydrate_all(&self, rows: Vec<PlaylistRow>) -> Result<Vec<Playlist>, ServiceError> {
        let mut playlists = Vec::with_capacity(rows.len());
        for row in rows {
            playlists.push(self.hydrate(row).await?);
        }
        Ok(playlists)
    }

    async fn find_playlist(&self, id: i64) -> Result<Playlist, ServiceError> {
        let row = sqlx::query_as::<_, PlaylistRow>(&format!("{PLAYLIST_COLUMNS} where p.id = ?"))
            .bind(id)
            .fetch_optional(&self.0)
            .await?
            .ok_or(ServiceError::PlaylistNotFound(id))?;
        Ok(self.hydrate(row).await?)
    }

    async fn playlist_exists(&self, id: i64) -> Result<bool, sqlx::Error> {
        let found = sqlx::query_scalar::<_, i64>("select id from playlist where id = ?")
            .bind(id)
            .fetch_optional(&self.0)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl PlaylistService for Database {
    async fn get_playlists(&self, id_user: Option<Id>) -> Result<Vec<Playlist>, ServiceError> {
        let rows = match id_user {
            None => {
                sqlx::query_as::<_, PlaylistRow>(&format!("{PLAYLIST_COLUMNS} order by p.id"))
                    .fetch_all(&self.0)
                    .await?
            }
            Some(id_user) => {
                sqlx::query_as::<_, PlaylistRow>(&format!(
                    "{PLAYLIST_COLUMNS} where p.id_user = ? order by p.id"
                ))
                .bind(key(id_user)?)
                .fetch_all(&self.0)
                .await?
            }
        };
        self.hydrate_all(rows).await
    }

    async fn get_playlists_by_filter(
        &self,
        id_user: Id,
        filter: &Filter,
    ) -> Result<Vec<Playlist>, ServiceError> {
        let mut qb = QueryBuilder::<Sqlite>::new(PLAYLIST_COLUMNS);
        qb.push(" where p.id_user = ");
        qb.push_bind(key(id_user)?);
        // plain case-insensitive substring match, no LIKE wildcards
        for (field, value) in filter.pairs() {
            let column = match field {
                "name" => "p.name",
                "description" => "p.description",
                "musica" => "m.name",
                "artist" => "m.artist",
                other => return Err(ServiceError::UnknownFilter(other.to_string())),
            };
            if column.starts_with("m.") {
                qb.push(
                    " and exists (select 1 from playlist_musica pm \
                     join musica m on m.id = pm.id_musica \
                     where pm.id_playlist = p.id and ",
                );
            } else {
                qb.push(" and (");
            }
            qb.push("instr(lower(coalesce(")
                .push(column)
                .push(", '')), lower(")
                .push_bind(value.to_string())
                .push(")) > 0)");
        }
        qb.push(" order by p.id");
        let rows = qb.build_query_as::<PlaylistRow>().fetch_all(&self.0).await?;
        self.hydrate_all(rows).await
    }

    async fn get_playlist(&self, id: Id) -> Result<Playlist, ServiceError> {
        self.find_playlist(key(id)?).await
    }

    async fn add_music_to_playlist(
        &self,
        id: Id,
        id_musica: Id,
    ) -> Result<Playlist, ServiceError> {
        let (id, id_musica) = (key(id)?, key(id_musica)?);
        let mut tx = self.0.begin().await?;
        sqlx::query_scalar::<_, i64>("select id from playlist where id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::PlaylistNotFound(id))?;
        sqlx::query_scalar::<_, i64>("select id from musica where id = ?")
            .bind(id_musica)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::MusicaNotFound(id_musica))?;
        let present = sqlx::query_scalar::<_, i64>(
            "select position from playlist_musica where id_playlist = ? and id_musica = ?",
        )
        .bind(id)
        .bind(id_musica)
        .fetch_optional(&mut *tx)
        .await?;
        if present.is_some() {
            return Err(ServiceError::MusicaAlreadyInPlaylist {
                playlist: id,
                musica: id_musica,
            });
        }
        sqlx::query(
            "insert into playlist_musica (id_playlist, id_musica, position) \
             select ?, ?, coalesce(max(position) + 1, 0) from playlist_musica where id_playlist = ?",
        )
        .bind(id)
        .bind(id_musica)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        self.find_playlist(id).await
    }

    async fn delete_music_from_playlist(
        &self,
        id: Id,
        id_musica: Id,
    ) -> Result<Playlist, ServiceError> {
        let (id, id_musica) = (key(id)?, key(id_musica)?);
        if !self.playlist_exists(id).await? {
            return Err(ServiceError::PlaylistNotFound(id));
        }
        let removed = sqlx::query("delete from playlist_musica where id_playlist = ? and id_musica = ?")
            .bind(id)
            .bind(id_musica)
            .execute(&self.0)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(ServiceError::MusicaNotInPlaylist {
                playlist: id,
                musica: id_musica,
            });
        }
        self.find_playlist(id).await
    }
}
