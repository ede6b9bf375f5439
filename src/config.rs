// src/config.rs

use std::env;

use dotenvy::dotenv;
use url::Url;

/// Number of questions the oracle is asked for per session.
pub const QUESTION_COUNT: usize = 10;

/// Per-question answer deadline in seconds.
pub const QUESTION_TIME_LIMIT_SECS: u64 = 60;

/// How long an issued OTP code stays valid.
pub const OTP_TTL_SECS: i64 = 5 * 60;

/// Oracle HTTP calls are cut off after this long.
pub const ORACLE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,

    /// JSON relay endpoint for outgoing mail. When unset, mail is logged
    /// instead of sent (dev mode).
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60 * 60 * 24 * 7);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let gemini_api_key = env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        let gemini_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        Url::parse(&gemini_base_url).expect("GEMINI_BASE_URL must be a valid URL");

        let mail_relay_url = env::var("MAIL_RELAY_URL").ok();
        if let Some(relay) = &mail_relay_url {
            Url::parse(relay).expect("MAIL_RELAY_URL must be a valid URL");
        }

        let mail_from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "SmartLearn <no-reply@smartlearn.app>".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            mail_relay_url,
            mail_from,
        }
    }
}
