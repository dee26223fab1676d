use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::config::Config;
use crate::handlers;
use crate::state::AppState;

/// Builds the application state once and serves until shutdown.
pub async fn run(config: Config) -> std::io::Result<()> {
    let bind = (config.host.clone(), config.port);
    let app_state = AppState::from_config(config).map_err(std::io::Error::other)?;

    info!(
        host = %bind.0,
        port = bind.1,
        delivery = %app_state.config.delivery,
        mirror = app_state.mirror().is_enabled(),
        sessions = %app_state.config.session_dir.display(),
        "starting server"
    );

    let app_state = web::Data::new(app_state);
    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(handlers::configure)
    })
    .bind(bind)?
    .run()
    .await
}
