// tests/community_tests.rs
//
// Feed CRUD, ownership checks, and counter maintenance. Same harness as
// api_tests.rs; needs DATABASE_URL.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backend::attempts::PgAttemptStore;
use backend::config::Config;
use backend::error::AppError;
use backend::mail::Mailer;
use backend::models::attempt::InterviewAnswer;
use backend::models::question::{InterviewQuestion, QuizQuestion};
use backend::oracle::{QuestionOracle, ScoringOracle};
use backend::otp::OtpLedger;
use backend::routes;
use backend::session::SessionManager;
use backend::state::AppState;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

struct UnusedOracle;

#[async_trait]
impl QuestionOracle for UnusedOracle {
    async fn quiz_batch(
        &self,
        _subject: &str,
        _count: usize,
    ) -> Result<Vec<QuizQuestion>, AppError> {
        Err(AppError::Oracle("not under test".to_string()))
    }

    async fn interview_batch(
        &self,
        _subject: &str,
        _count: usize,
    ) -> Result<Vec<InterviewQuestion>, AppError> {
        Err(AppError::Oracle("not under test".to_string()))
    }
}

struct UnusedScoring;

#[async_trait]
impl ScoringOracle for UnusedScoring {
    async fn score_answers(&self, _items: &[InterviewAnswer]) -> Result<Vec<i32>, AppError> {
        Err(AppError::Oracle("not under test".to_string()))
    }
}

struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> Result<(), AppError> {
        Ok(())
    }
}

async fn spawn_app() -> (String, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "community_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        gemini_api_key: "unused".to_string(),
        gemini_model: "unused".to_string(),
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        mail_relay_url: None,
        mail_from: "SmartLearn <test@smartlearn.app>".to_string(),
    };

    let sessions = SessionManager::new(
        Arc::new(UnusedScoring),
        Arc::new(PgAttemptStore::new(pool.clone())),
        Duration::from_secs(60),
    );

    let state = AppState {
        pool: pool.clone(),
        config,
        mailer: Arc::new(NoopMailer),
        oracle: Arc::new(UnusedOracle),
        otp: OtpLedger::new(pool.clone()),
        sessions,
    };

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (address, pool)
}

async fn register_user(client: &reqwest::Client, address: &str, pool: &PgPool) -> String {
    let email = format!("u_{}@test.dev", &uuid::Uuid::new_v4().to_string()[..8]);

    client
        .post(format!("{address}/api/auth/send-otp"))
        .json(&serde_json::json!({ "email": email }))
        .send()
        .await
        .unwrap();

    let code: String = sqlx::query("SELECT code FROM otps WHERE email = $1")
        .bind(&email)
        .fetch_one(pool)
        .await
        .unwrap()
        .get("code");

    client
        .post(format!("{address}/api/auth/verify-otp"))
        .json(&serde_json::json!({ "email": email, "otp": code }))
        .send()
        .await
        .unwrap();

    let resp: serde_json::Value = client
        .post(format!("{address}/api/auth/register"))
        .json(&serde_json::json!({ "name": "Tester", "email": email, "password": "pw1234" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    resp["token"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn post_like_comment_flow() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let token_a = register_user(&client, &address, &pool).await;
    let token_b = register_user(&client, &address, &pool).await;

    // A posts; script tags are sanitized away
    let post: serde_json::Value = client
        .post(format!("{address}/api/community/posts"))
        .bearer_auth(&token_a)
        .json(&serde_json::json!({
            "content": "Heap vs stack <script>alert(1)</script> notes",
            "category": "DSA"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let post_id = post["id"].as_i64().unwrap();
    assert!(!post["content"].as_str().unwrap().contains("script"));

    // B likes, then unlikes, then likes again
    for expected in [true, false, true] {
        let resp: serde_json::Value = client
            .post(format!("{address}/api/community/posts/{post_id}/like"))
            .bearer_auth(&token_b)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp["liked"], expected);
    }

    // B comments
    let resp = client
        .post(format!("{address}/api/community/posts/{post_id}/comments"))
        .bearer_auth(&token_b)
        .json(&serde_json::json!({ "content": "Nice summary!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    // Counters reflect the interactions
    let posts: Vec<serde_json::Value> = client
        .get(format!("{address}/api/community/posts"))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let listed = posts
        .iter()
        .find(|p| p["id"].as_i64() == Some(post_id))
        .expect("post should be listed");
    assert_eq!(listed["likes_count"], 1);
    assert_eq!(listed["comments_count"], 1);

    let comments: Vec<serde_json::Value> = client
        .get(format!("{address}/api/community/posts/{post_id}/comments"))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["content"], "Nice summary!");
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn only_the_author_can_edit_or_delete() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let token_a = register_user(&client, &address, &pool).await;
    let token_b = register_user(&client, &address, &pool).await;

    let post: serde_json::Value = client
        .post(format!("{address}/api/community/posts"))
        .bearer_auth(&token_a)
        .json(&serde_json::json!({ "content": "original" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let post_id = post["id"].as_i64().unwrap();

    // B cannot edit or delete A's post
    let resp = client
        .put(format!("{address}/api/community/posts/{post_id}"))
        .bearer_auth(&token_b)
        .json(&serde_json::json!({ "content": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = client
        .delete(format!("{address}/api/community/posts/{post_id}"))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // A can do both
    let edited: serde_json::Value = client
        .put(format!("{address}/api/community/posts/{post_id}"))
        .bearer_auth(&token_a)
        .json(&serde_json::json!({ "content": "revised" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(edited["content"], "revised");

    let resp = client
        .delete(format!("{address}/api/community/posts/{post_id}"))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
}
