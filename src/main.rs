// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use backend::attempts::PgAttemptStore;
use backend::config::{Config, QUESTION_TIME_LIMIT_SECS};
use backend::mail::{HttpMailer, LogMailer, Mailer};
use backend::oracle::{GeminiClient, ScoringOracle};
use backend::otp::OtpLedger;
use backend::routes;
use backend::session::SessionManager;
use backend::state::AppState;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Wire up collaborators: one Gemini client serves as both oracles.
    let gemini = Arc::new(GeminiClient::new(&config));
    let scoring: Arc<dyn ScoringOracle> = gemini.clone();

    let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
        Some(relay) => Arc::new(HttpMailer::new(&config, relay.clone())),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set; OTP emails will be logged, not sent");
            Arc::new(LogMailer)
        }
    };

    let sessions = SessionManager::new(
        scoring,
        Arc::new(PgAttemptStore::new(pool.clone())),
        Duration::from_secs(QUESTION_TIME_LIMIT_SECS),
    );

    // Create AppState
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        mailer,
        oracle: gemini,
        otp: OtpLedger::new(pool),
        sessions,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server. ConnectInfo feeds the rate limiter's per-IP keys.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
