use std::error::Error;

use foodgram::{api, AppState, Config, SessionKey};
use redis::aio::MultiplexedConnection;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

async fn connect_cache(url: Option<&str>) -> Option<MultiplexedConnection> {
    let Some(url) = url else {
        log::info!("REDIS_URL not set, caching disabled");
        return None;
    };

    let connection = match redis::Client::open(url) {
        Ok(client) => client.get_multiplexed_async_connection().await,
        Err(e) => Err(e),
    };
    match connection {
        Ok(connection) => Some(connection),
        Err(e) => {
            log::warn!("Failed to connect to redis, caching disabled: {e}");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }
    log::info!("Server shutting down...");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    log::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let cache = connect_cache(config.redis_url.as_deref()).await;
    let session_key = SessionKey::new(config.session_secret.as_bytes())
        .map_err(|e| format!("Invalid SESSION_SECRET: {:?}", e.info))?;

    let state = AppState::new(pool, cache, session_key, &config.public_base_url);

    let (address, server) = warp::serve(api(state))
        .bind_with_graceful_shutdown(([0, 0, 0, 0], config.port), shutdown_signal());
    log::info!("Server running on {address}");
    server.await;

    Ok(())
}
