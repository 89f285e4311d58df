use api_gatekeeper::{
    AppState, TokenVerifier,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    routes::validate_exemptions,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, validates the exemption table against the
/// registered routes, connects to Postgres and serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise a sensible default.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "api_gatekeeper=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Key material and exemption table are immutable from here on.
    let verifier = TokenVerifier::from_config(&config)
        .expect("FATAL: JWT_PUBLIC_KEY is not a valid PEM encoded RSA public key.");

    validate_exemptions(&config.exemptions)
        .unwrap_or_else(|e| panic!("FATAL: exemption table does not match the routes. {e}"));
    tracing::info!(rules = config.exemptions.len(), "Exemption table validated.");

    // 4. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Router and server
    let app = create_router(AppState::new(repo, verifier, &config));

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address)
        .await
        .expect("FATAL: Failed to bind the listener.");

    tracing::info!("Listening on {address}");

    axum::serve(listener, app)
        .await
        .expect("FATAL: Server stopped unexpectedly.");
}
