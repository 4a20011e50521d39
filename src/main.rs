use std::net::TcpListener;
use std::sync::Arc;

use chirpy::configuration::get_configuration;
use chirpy::session::{SessionPolicy, SessionService};
use chirpy::startup::run;
use chirpy::store::PgStore;
use chirpy::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

fn startup_error(kind: std::io::ErrorKind, message: &'static str) -> std::io::Error {
    std::io::Error::new(kind, message)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!(error = %e, "Failed to read configuration");
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    tracing::info!(platform = ?configuration.application.platform, "Configuration loaded");

    let codec = configuration.auth.access_token_codec().map_err(|e| {
        tracing::error!(error = %e, "Invalid auth configuration");
        startup_error(std::io::ErrorKind::InvalidInput, "Auth configuration error")
    })?;
    let policy = SessionPolicy::from_settings(&configuration.auth).map_err(|e| {
        tracing::error!(error = %e, "Invalid token lifetimes");
        startup_error(std::io::ErrorKind::InvalidInput, "Auth configuration error")
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create connection pool");
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to run migrations");
        startup_error(std::io::ErrorKind::Other, "Database migration error")
    })?;
    tracing::info!("Database ready");

    let store = Arc::new(PgStore::new(pool));
    let sessions = SessionService::new(
        store.clone(),
        store,
        codec,
        policy,
        configuration.application.platform,
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    run(listener, sessions)?.await
}
