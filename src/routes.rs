// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, community, dashboard, interview, otp, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, interview, community, dashboard).
/// * Applies global middleware (Trace, CORS) and per-route rate limits.
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:5173".parse().unwrap(),
        "http://127.0.0.1:5173".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Email-dispatching routes are throttled per client IP.
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(5)
        .finish()
        .unwrap();
    let governor_conf = Arc::new(governor_conf);

    let otp_dispatch_routes = Router::new()
        .route("/send-otp", post(otp::send_otp))
        .route("/resend-otp", post(otp::resend_otp))
        .route("/forgot-password/send-otp", post(otp::forgot_password_send_otp))
        .layer(GovernorLayer::new(governor_conf));

    let auth_routes = Router::new()
        .merge(otp_dispatch_routes)
        .route("/verify-otp", post(otp::verify_otp))
        .route("/forgot-password/verify-otp", post(otp::forgot_password_verify_otp))
        .route("/forgot-password/reset", post(otp::reset_password))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected profile routes
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route("/update-profile", put(auth::update_profile))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let quiz_routes = Router::new()
        .route("/session/start", post(quiz::start_session))
        .route("/session", get(quiz::current_session))
        .route("/session/answer", post(quiz::submit_answer))
        .route("/session/exit", post(quiz::exit_session))
        .route("/my", get(quiz::list_my_attempts))
        .route("/{id}", get(quiz::get_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let interview_routes = Router::new()
        .route("/session/start", post(interview::start_session))
        .route("/session", get(interview::current_session))
        .route("/session/answer", post(interview::submit_answer))
        .route("/session/skip", post(interview::skip_question))
        .route("/session/exit", post(interview::exit_session))
        .route("/my", get(interview::list_my_attempts))
        .route("/{id}", get(interview::get_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let community_routes = Router::new()
        .route(
            "/posts",
            get(community::list_posts).post(community::create_post),
        )
        .route(
            "/posts/{id}",
            put(community::update_post).delete(community::delete_post),
        )
        .route("/posts/{id}/like", post(community::toggle_like))
        .route(
            "/posts/{id}/comments",
            get(community::list_comments).post(community::create_comment),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let dashboard_routes = Router::new()
        .route("/progress", get(dashboard::progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/interview", interview_routes)
        .nest("/api/community", community_routes)
        .nest("/api/dashboard", dashboard_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
