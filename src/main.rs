mod api;
mod db;
mod middlewares;
mod service;
mod types;

use actix_cors::Cors;
use actix_web::{web::Data, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use db::{Database, Seed};
use service::PlaylistService;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();
    let config = types::Config::from_env().context("invalid configuration in environment")?;

    let db = Database::connect(
        &config.database_url,
        config.db_retries,
        Duration::from_millis(config.db_retry_delay_ms),
    )
    .await
    .with_context(|| format!("could not open {}", config.database_url))?;
    if let Some(path) = &config.seed_path {
        db.seed(Seed::from_file(path)?)
            .await
            .with_context(|| format!("could not load seed {path}"))?;
    }
    let service: Arc<dyn PlaylistService> = Arc::new(db);
    let service = Data::from(service);

    info!("listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        let cors = Cors::permissive();
        App::new()
            .wrap(cors)
            .wrap(middlewares::security_headers())
            .wrap(middlewares::normalize_path())
            .wrap(middlewares::logger())
            .configure(api::routes(service.clone()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;
    Ok(())
}
