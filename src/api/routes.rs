use super::playlist;
use super::types::SuccessResult;
use crate::service::PlaylistService;
use actix_web::get;
use actix_web::web::{Data, ServiceConfig};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[get("/ping")]
pub async fn ping() -> SuccessResult<u64> {
    SuccessResult {
        msg: "pong".to_string(),
        data: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis() as u64,
    }
}

pub fn routes(service: Data<dyn PlaylistService>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(ping);
        playlist::routes(service)(cfg);
    }
}
