use carhub_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    payments::{PaymentState, StripeClient},
    repository::{PostgresRepository, RepositoryState},
    storage::{StorageState, SupabaseStorageClient},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Asynchronous entry point. Initializes configuration, logging, the
/// database pool, the storage and payment clients, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast in Production).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter setup. RUST_LOG wins; otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "carhub_api=debug,tower_http=info,axum=trace".into());

    // 3. Structured logging format selected by environment.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database initialization (Postgres).
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Storage initialization (Supabase Storage HTTP API).
    let storage = Arc::new(SupabaseStorageClient::new(
        &config.supabase_url,
        &config.service_role_key,
    )) as StorageState;

    // 6. Payments initialization. Absent key means the checkout endpoints
    // answer 503 instead of the process refusing to start.
    let payments: Option<PaymentState> = match &config.stripe_secret {
        Some(secret) => Some(Arc::new(StripeClient::new(secret)) as PaymentState),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set; checkout endpoints disabled");
            None
        }
    };

    // 7. Unified state assembly.
    let app_state = AppState {
        repo,
        storage,
        payments,
        config,
    };

    // 8. Router and server startup.
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
