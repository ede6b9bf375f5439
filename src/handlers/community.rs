// src/handlers/community.rs
//
// Ownership-checked CRUD for the community feed. Post bodies are sanitized
// before storage; like/comment counters are maintained transactionally.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::post::{
        CommentResponse, CreateCommentRequest, CreatePostRequest, Post, PostListParams,
        UpdatePostRequest,
    },
    utils::{html::clean_html, jwt::Claims},
};

const POST_COLUMNS: &str = r#"
    p.id, p.user_id, u.name as author_name, u.avatar_url as author_avatar,
    p.content, p.category, p.image_url,
    p.likes_count, p.comments_count, p.created_at, p.updated_at
"#;

async fn fetch_post(pool: &PgPool, id: i64) -> Result<Post, AppError> {
    let post = sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON p.user_id = u.id WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(post)
}

/// Create a new post.
pub async fn create_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let content = clean_html(&payload.content);

    let (post_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO posts (user_id, content, category, image_url)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&content)
    .bind(payload.category.as_deref())
    .bind(payload.image_url.as_deref())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let post = fetch_post(&pool, post_id).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// List posts (recent first) with author fields joined in.
/// Supports cursor-based pagination.
pub async fn list_posts(
    State(pool): State<PgPool>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100); // Default 20, max 100

    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts p
        JOIN users u ON p.user_id = u.id
        WHERE ($1::TIMESTAMPTZ IS NULL OR p.created_at < $1)
        ORDER BY p.created_at DESC
        LIMIT $2
        "#
    ))
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list posts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(posts))
}

/// Edit a post. Author only; absent fields are left untouched.
pub async fn update_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    let owner: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    let (owner_id,) = owner.ok_or(AppError::NotFound("Post not found".to_string()))?;

    if owner_id != user_id {
        return Err(AppError::Unauthorized(
            "You are not authorized to edit this post".to_string(),
        ));
    }

    let content = payload.content.as_deref().map(clean_html);

    sqlx::query(
        r#"
        UPDATE posts
        SET content = COALESCE($2, content),
            category = COALESCE($3, category),
            image_url = COALESCE($4, image_url),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(content.as_deref())
    .bind(payload.category.as_deref())
    .bind(payload.image_url.as_deref())
    .execute(&pool)
    .await?;

    let post = fetch_post(&pool, id).await?;
    Ok(Json(post))
}

/// Delete a post. Author only; likes and comments go with it.
pub async fn delete_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let owner: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    let (owner_id,) = owner.ok_or(AppError::NotFound("Post not found".to_string()))?;

    if owner_id != user_id {
        return Err(AppError::Unauthorized(
            "You are not authorized to delete this post".to_string(),
        ));
    }

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Toggle Like on a post.
pub async fn toggle_like(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let existing = sqlx::query("SELECT 1 FROM post_likes WHERE user_id = $1 AND post_id = $2")
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

    let is_liked = existing.is_some();

    if is_liked {
        // Unlike
        sqlx::query("DELETE FROM post_likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE posts SET likes_count = GREATEST(0, likes_count - 1) WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
    } else {
        // Like
        sqlx::query("INSERT INTO post_likes (user_id, post_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if e.to_string().contains("unique constraint") {
                    // Concurrent request handled gracefully
                    return AppError::Validation("Already liked".to_string());
                }
                AppError::InternalServerError(e.to_string())
            })?;

        sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "liked": !is_liked })))
}

/// Create a new comment.
pub async fn create_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let content = clean_html(&payload.content);

    let mut tx = pool.begin().await?;

    let post = sqlx::query("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
    if post.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let (comment_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO comments (post_id, user_id, content)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(&content)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": comment_id })),
    ))
}

/// List all comments for a post, oldest first.
pub async fn list_comments(
    State(pool): State<PgPool>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comments = sqlx::query_as::<_, CommentResponse>(
        r#"
        SELECT c.id, c.post_id, c.user_id, u.name as author_name, c.content, c.created_at
        FROM comments c
        JOIN users u ON c.user_id = u.id
        WHERE c.post_id = $1
        ORDER BY c.created_at ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(comments))
}
