use std::{error::Error, net::SocketAddr};

use foodgram::{
    config::Config,
    media::MediaStorage,
    routes::{api, handle_rejection, Context},
};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};
use warp::{http::Method, Filter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    log::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    log::info!("Running migrations...");
    sqlx::migrate!().run(&pool).await?;

    let media = MediaStorage::new(config.media_root.clone(), config.media_url.clone());
    let context = Context::new(pool, config.jwt_secret.clone(), media);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(["authorization", "content-type"])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let routes = api(context)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("foodgram::api"));

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (address, server) =
        warp::serve(routes).try_bind_with_graceful_shutdown(address, shutdown_signal())?;

    log::info!("Server running on {address}");
    server.await;
    log::info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Received Ctrl+C, shutting down");
}
