// src/models/post.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A community post joined with its author's display fields.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub author_avatar: String,
    pub content: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a post. Content is sanitized before storage.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 5000, message = "Content is required."))]
    pub content: String,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    /// Opaque reference into the image store.
    pub image_url: Option<String>,
}

/// DTO for editing a post. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Query params for post listing (cursor-based pagination).
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    pub limit: Option<i64>,
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,
}

/// A comment joined with its author's name.
#[derive(Debug, FromRow, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment text is required."))]
    pub content: String,
}
