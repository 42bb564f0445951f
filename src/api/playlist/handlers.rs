use crate::api::types::{transform_request_on_msg, FailureResult, SuccessResult, FAILURE};
use crate::service::{PlaylistService, ServiceError};
use crate::types::{Filter, Id, Playlist};
use actix_web::http::StatusCode;
use actix_web::web::{Data, Path, Query};
use actix_web::{delete, get, post, Either, HttpRequest};
use log::{debug, error};

type Envelope<T> = Either<SuccessResult<T>, FailureResult>;

const ADD_FALLBACK: &str = "Failed to update the playlist.";
const DELETE_FALLBACK: &str = "Failed to delete the playlist.";

#[get("")]
pub async fn get_playlists(
    req: HttpRequest,
    service: Data<dyn PlaylistService>,
) -> Result<SuccessResult<Vec<Playlist>>, ServiceError> {
    let playlists = service.get_playlists(None).await?;
    Ok(SuccessResult {
        msg: transform_request_on_msg(&req),
        data: playlists,
    })
}

#[get("/{id}")]
pub async fn get_playlist(
    req: HttpRequest,
    id: Path<String>,
    service: Data<dyn PlaylistService>,
) -> Envelope<Playlist> {
    let id = Id::from_param(&id);
    match service.get_playlist(id).await {
        Ok(playlist) => Either::Left(SuccessResult {
            msg: transform_request_on_msg(&req),
            data: playlist,
        }),
        Err(e) => {
            error!("could not fetch playlist {id}: {e}");
            Either::Right(FailureResult {
                msg: transform_request_on_msg(&req),
                status: StatusCode::NOT_FOUND,
                msg_code: FAILURE,
            })
        }
    }
}

// any query string at all switches to the filtered lookup
#[get("/user/{id_user}/playlist")]
pub async fn get_user_playlists(
    req: HttpRequest,
    id_user: Path<String>,
    filter: Query<Filter>,
    service: Data<dyn PlaylistService>,
) -> Result<SuccessResult<Vec<Playlist>>, ServiceError> {
    let id_user = Id::from_param(&id_user);
    let playlists = if filter.is_empty() {
        debug!("listing playlists of user {id_user}");
        service.get_playlists(Some(id_user)).await?
    } else {
        debug!("filtering playlists of user {id_user} by {:?}", *filter);
        service.get_playlists_by_filter(id_user, &filter).await?
    };
    Ok(SuccessResult {
        msg: transform_request_on_msg(&req),
        data: playlists,
    })
}

#[post("/{id}/musica/{id_musica}")]
pub async fn add_music_to_playlist(
    path: Path<(String, String)>,
    service: Data<dyn PlaylistService>,
) -> Envelope<Playlist> {
    let (id, id_musica) = (Id::from_param(&path.0), Id::from_param(&path.1));
    let result = service.add_music_to_playlist(id, id_musica).await;
    mutation_outcome(result, ADD_FALLBACK)
}

#[delete("/{id}/musica/{id_musica}")]
pub async fn delete_music_from_playlist(
    path: Path<(String, String)>,
    service: Data<dyn PlaylistService>,
) -> Envelope<Playlist> {
    let (id, id_musica) = (Id::from_param(&path.0), Id::from_param(&path.1));
    let result = service.delete_music_from_playlist(id, id_musica).await;
    mutation_outcome(result, DELETE_FALLBACK)
}

fn mutation_outcome(result: Result<Playlist, ServiceError>, fallback: &str) -> Envelope<Playlist> {
    match result {
        Ok(playlist) => Either::Left(SuccessResult {
            msg: "pegou".to_string(),
            data: playlist,
        }),
        Err(e) => {
            error!("playlist mutation failed: {e}");
            Either::Right(FailureResult {
                msg: e.message().unwrap_or_else(|| fallback.to_string()),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                msg_code: FAILURE,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::routes::routes;
    use super::*;
    use crate::types::Musica;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockService {
        calls: Mutex<Vec<String>>,
        fail_with: Option<fn() -> ServiceError>,
    }

    impl MockService {
        fn failing(f: fn() -> ServiceError) -> Self {
            Self {
                fail_with: Some(f),
                ..Self::default()
            }
        }

        fn record(&self, call: String) -> Result<(), ServiceError> {
            self.calls.lock().unwrap().push(call);
            match self.fail_with {
                Some(f) => Err(f()),
                None => Ok(()),
            }
        }
    }

    fn sample(id: i64) -> Playlist {
        Playlist {
            id,
            id_user: 1,
            name: "X".to_string(),
            description: None,
            musicas: vec![Musica {
                id: 3,
                name: "Song".to_string(),
                artist: "Band".to_string(),
                album: None,
                duration: 180,
            }],
        }
    }

    #[async_trait]
    impl PlaylistService for MockService {
        async fn get_playlists(&self, id_user: Option<Id>) -> Result<Vec<Playlist>, ServiceError> {
            let label = id_user.map(|u| u.to_string()).unwrap_or_default();
            self.record(format!("get_playlists({label})"))?;
            Ok(vec![sample(1), sample(2)])
        }

        async fn get_playlists_by_filter(
            &self,
            id_user: Id,
            filter: &Filter,
        ) -> Result<Vec<Playlist>, ServiceError> {
            let pairs: Vec<_> = filter.pairs().collect();
            self.record(format!("get_playlists_by_filter({id_user}, {pairs:?})"))?;
            Ok(vec![sample(4)])
        }

        async fn get_playlist(&self, id: Id) -> Result<Playlist, ServiceError> {
            self.record(format!("get_playlist({id})"))?;
            Ok(sample(id.as_integer().unwrap_or(0)))
        }

        async fn add_music_to_playlist(
            &self,
            id: Id,
            id_musica: Id,
        ) -> Result<Playlist, ServiceError> {
            self.record(format!("add_music_to_playlist({id}, {id_musica})"))?;
            Ok(sample(id.as_integer().unwrap_or(0)))
        }

        async fn delete_music_from_playlist(
            &self,
            id: Id,
            id_musica: Id,
        ) -> Result<Playlist, ServiceError> {
            self.record(format!("delete_music_from_playlist({id}, {id_musica})"))?;
            Ok(sample(id.as_integer().unwrap_or(0)))
        }
    }

    async fn call(
        mock: Arc<MockService>,
        req: test::TestRequest,
    ) -> (StatusCode, Option<Value>) {
        let service: Arc<dyn PlaylistService> = mock;
        let app = test::init_service(App::new().configure(routes(Data::from(service)))).await;
        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        let body = test::read_body(resp).await;
        (status, serde_json::from_slice(&body).ok())
    }

    fn calls(mock: &MockService) -> Vec<String> {
        mock.calls.lock().unwrap().clone()
    }

    fn opaque() -> ServiceError {
        ServiceError::Database(sqlx::Error::PoolClosed)
    }

    #[actix_web::test]
    async fn lists_every_playlist() {
        let mock = Arc::new(MockService::default());
        let (status, body) = call(mock.clone(), test::TestRequest::get().uri("/playlist")).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert_eq!(body["msg"], "GET /playlist");
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(calls(&mock), ["get_playlists()"]);
    }

    #[actix_web::test]
    async fn list_failures_are_not_enveloped() {
        let mock = Arc::new(MockService::failing(opaque));
        let (status, body) = call(mock, test::TestRequest::get().uri("/playlist")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, None);
    }

    #[actix_web::test]
    async fn fetches_one_playlist() {
        let mock = Arc::new(MockService::default());
        let (status, body) = call(mock.clone(), test::TestRequest::get().uri("/playlist/5")).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert_eq!(body["msg"], "GET /playlist/5");
        assert_eq!(body["data"]["id"], 5);
        assert_eq!(body["data"]["name"], "X");
        assert_eq!(calls(&mock), ["get_playlist(5)"]);
    }

    #[actix_web::test]
    async fn missing_playlist_is_404() {
        let mock = Arc::new(MockService::failing(|| ServiceError::PlaylistNotFound(99)));
        let (status, body) = call(mock, test::TestRequest::get().uri("/playlist/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap(), json!({"msg": "GET /playlist/99", "code": "failure"}));
    }

    #[actix_web::test]
    async fn non_numeric_id_is_forwarded_as_nan() {
        let mock = Arc::new(MockService::default());
        call(mock.clone(), test::TestRequest::get().uri("/playlist/abc")).await;
        call(mock.clone(), test::TestRequest::post().uri("/playlist/1/musica/xyz")).await;
        assert_eq!(
            calls(&mock),
            ["get_playlist(NaN)", "add_music_to_playlist(1, NaN)"]
        );
    }

    #[actix_web::test]
    async fn user_playlists_without_query() {
        let mock = Arc::new(MockService::default());
        let (status, body) = call(mock.clone(), test::TestRequest::get().uri("/user/7/playlist")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["msg"], "GET /user/7/playlist");
        assert_eq!(calls(&mock), ["get_playlists(7)"]);
    }

    #[actix_web::test]
    async fn bare_question_mark_is_unfiltered() {
        let mock = Arc::new(MockService::default());
        call(mock.clone(), test::TestRequest::get().uri("/user/7/playlist?")).await;
        assert_eq!(calls(&mock), ["get_playlists(7)"]);
    }

    #[actix_web::test]
    async fn any_query_switches_to_filter() {
        let mock = Arc::new(MockService::default());
        call(mock.clone(), test::TestRequest::get().uri("/user/7/playlist?a=")).await;
        call(
            mock.clone(),
            test::TestRequest::get().uri("/user/7/playlist?name=rock&artist=The%20Band&name=pop"),
        )
        .await;
        assert_eq!(
            calls(&mock),
            [
                r#"get_playlists_by_filter(7, [("a", "")])"#,
                r#"get_playlists_by_filter(7, [("name", "rock"), ("artist", "The Band"), ("name", "pop")])"#,
            ]
        );
    }

    #[actix_web::test]
    async fn filter_failures_are_not_enveloped() {
        let mock = Arc::new(MockService::failing(|| ServiceError::UnknownFilter("a".into())));
        let (status, body) = call(mock, test::TestRequest::get().uri("/user/7/playlist?a=1")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, None);
    }

    #[actix_web::test]
    async fn adds_musica() {
        let mock = Arc::new(MockService::default());
        let (status, body) =
            call(mock.clone(), test::TestRequest::post().uri("/playlist/5/musica/3")).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert_eq!(body["msg"], "pegou");
        assert_eq!(body["data"]["id"], 5);
        assert_eq!(body["data"]["musicas"][0]["id"], 3);
        assert_eq!(calls(&mock), ["add_music_to_playlist(5, 3)"]);
    }

    #[actix_web::test]
    async fn add_failure_carries_the_message() {
        let mock = Arc::new(MockService::failing(|| ServiceError::MusicaNotFound(3)));
        let (status, body) = call(mock, test::TestRequest::post().uri("/playlist/5/musica/3")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.unwrap(), json!({"msg": "musica 3 not found", "code": "failure"}));
    }

    #[actix_web::test]
    async fn opaque_add_failure_uses_fallback() {
        let mock = Arc::new(MockService::failing(opaque));
        let (status, body) = call(mock, test::TestRequest::post().uri("/playlist/5/musica/3")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body.unwrap(),
            json!({"msg": "Failed to update the playlist.", "code": "failure"})
        );
    }

    #[actix_web::test]
    async fn deletes_musica() {
        let mock = Arc::new(MockService::default());
        let (status, body) =
            call(mock.clone(), test::TestRequest::delete().uri("/playlist/5/musica/3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["msg"], "pegou");
        assert_eq!(calls(&mock), ["delete_music_from_playlist(5, 3)"]);
    }

    #[actix_web::test]
    async fn delete_failures() {
        let mock = Arc::new(MockService::failing(|| ServiceError::MusicaNotInPlaylist {
            playlist: 5,
            musica: 3,
        }));
        let (status, body) =
            call(mock, test::TestRequest::delete().uri("/playlist/5/musica/3")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body.unwrap(),
            json!({"msg": "musica 3 is not in playlist 5", "code": "failure"})
        );

        let mock = Arc::new(MockService::failing(opaque));
        let (_, body) = call(mock, test::TestRequest::delete().uri("/playlist/5/musica/3")).await;
        assert_eq!(body.unwrap()["msg"], "Failed to delete the playlist.");
    }
}
