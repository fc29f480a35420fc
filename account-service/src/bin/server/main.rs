use std::net::SocketAddr;
use std::sync::Arc;

use account_service::config::Config;
use account_service::domain::account::service::AuthService;
use account_service::inbound::http::router::create_router;
use account_service::outbound::repositories::PostgresAuditStore;
use account_service::outbound::repositories::PostgresUserRepository;
use auth::TokenIssuer;
use auth::TotpEngine;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        access_token_expire_minutes = config.jwt.access_token_expire_minutes,
        refresh_token_expire_days = config.jwt.refresh_token_expire_days,
        totp_issuer = %config.totp.issuer,
        login_rate_limit_per_minute = config.server.login_rate_limit_per_minute,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let token_issuer = Arc::new(TokenIssuer::new(
        config.jwt.secret.as_bytes(),
        Duration::minutes(config.jwt.access_token_expire_minutes),
        Duration::days(config.jwt.refresh_token_expire_days),
    ));
    let totp_engine = TotpEngine::new(config.totp.issuer.clone());

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let audit_store = Arc::new(PostgresAuditStore::new(pg_pool));

    let auth_service = Arc::new(AuthService::new(
        user_repository,
        audit_store,
        Arc::clone(&token_issuer),
        totp_engine,
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(
        auth_service,
        token_issuer,
        config.server.login_rate_limit_per_minute,
    );

    axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
