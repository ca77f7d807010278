use std::{net::SocketAddr, sync::Arc};

use newsdesk_api::{
    auth::{PasswordService, PgUserDirectory, TokenService},
    config::AppConfig,
    create_router, db,
    mail::SmtpMailer,
    users::PgProfileStore,
    with_rate_limit, AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Newsdesk API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let mailer = SmtpMailer::new(
        &config.email_host,
        &config.email_username,
        &config.email_password,
    )
    .expect("Failed to configure SMTP transport");

    let state = AppState::new(
        Arc::new(PgUserDirectory::new(db_pool.clone())),
        Arc::new(PgProfileStore::new(db_pool.clone())),
        Arc::new(mailer),
        PasswordService::new(config.bcrypt_cost),
        TokenService::with_lifetimes(
            &config.secret_key,
            config.session_ttl(),
            config.reset_token_ttl(),
        ),
        config.email_username.clone(),
    );

    // Create the application router
    let app = with_rate_limit(create_router(state), config.rate_limit_per_hour)
        .expect("Failed to configure rate limiting");

    // Start the Axum server
    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Newsdesk API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    db::close_pool(db_pool).await;
    tracing::info!("Newsdesk API stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
