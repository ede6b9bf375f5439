use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config, mail::Mailer, oracle::QuestionOracle, otp::OtpLedger, session::SessionManager,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
    pub oracle: Arc<dyn QuestionOracle>,
    pub otp: OtpLedger,
    pub sessions: SessionManager,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Mailer> {
    fn from_ref(state: &AppState) -> Self {
        state.mailer.clone()
    }
}

impl FromRef<AppState> for Arc<dyn QuestionOracle> {
    fn from_ref(state: &AppState) -> Self {
        state.oracle.clone()
    }
}

impl FromRef<AppState> for OtpLedger {
    fn from_ref(state: &AppState) -> Self {
        state.otp.clone()
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
