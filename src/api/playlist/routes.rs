use super::handlers;
use crate::service::PlaylistService;
use actix_web::web::{self, Data, ServiceConfig};

pub const PREFIX: &str = "/playlist";

/// Registers every playlist route, bound to `service`.
pub fn routes(service: Data<dyn PlaylistService>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(service)
            .service(
                web::scope(PREFIX)
                    .service(handlers::get_playlists)
                    .service(handlers::get_playlist)
                    .service(handlers::add_music_to_playlist)
                    .service(handlers::delete_music_from_playlist),
            )
            .service(handlers::get_user_playlists);
    }
}
