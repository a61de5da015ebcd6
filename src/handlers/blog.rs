use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::json_body;
use crate::models::{BlogPost, NewPost, PostFilter, PostUpdate};
use crate::services::blog::{check_post_fields, DEFAULT_RECENT_LIMIT};
use crate::state::AppState;

const MAX_RECENT_LIMIT: usize = 50;

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Post {id} not found"))
}

fn post_json(post: BlogPost) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "post": post }))
}

fn posts_json(posts: Vec<BlogPost>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "count": posts.len(),
        "posts": posts,
    }))
}

// GET /api/blog/posts
#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = match query.status.as_deref() {
        None | Some("all") => PostFilter::All,
        Some("published") => PostFilter::Published,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Unknown status filter '{other}', expected 'all' or 'published'"
            )))
        }
    };
    let posts = state.posts.list(filter).await?;
    Ok(posts_json(posts))
}

// POST /api/blog/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewPost>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let new = json_body(payload)?;
    check_post_fields(&new.title, &new.content).map_err(AppError::BadRequest)?;

    let post = state.posts.create(new).await?;
    Ok((StatusCode::CREATED, post_json(post)))
}

// GET /api/blog/posts/:id
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let post = state.posts.get(&id).await?.ok_or_else(|| not_found(&id))?;
    Ok(post_json(post))
}

// PUT /api/blog/posts/:id
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<PostUpdate>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let update = json_body(payload)?;
    check_post_fields(&update.title, &update.content).map_err(AppError::BadRequest)?;

    let post = state
        .posts
        .update(&id, update)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(post_json(post))
}

// DELETE /api/blog/posts/:id
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let post = state.posts.delete(&id).await?.ok_or_else(|| not_found(&id))?;
    Ok(post_json(post))
}

// POST /api/blog/posts/:id/publish
pub async fn publish_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let post = state.posts.publish(&id).await?.ok_or_else(|| not_found(&id))?;
    Ok(post_json(post))
}

// POST /api/blog/posts/:id/unpublish
pub async fn unpublish_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let post = state
        .posts
        .unpublish(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(post_json(post))
}

// GET /api/blog/recent
#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn recent_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    let posts = state.posts.recent(limit).await?;
    Ok(posts_json(posts))
}

// GET /api/blog/tags
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tags = state.posts.keywords().await?;
    Ok(Json(serde_json::json!({ "success": true, "tags": tags })))
}

// GET /api/blog/tags/:tag/posts
pub async fn posts_by_tag(
    State(state): State<Arc<AppState>>,
    Path(tag): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let posts = state.posts.by_keyword(&tag).await?;
    Ok(posts_json(posts))
}

// GET /api/blog/categories/:category/posts
pub async fn posts_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let posts = state.posts.by_category(&category).await?;
    Ok(posts_json(posts))
}

// GET /api/blog/archive
pub async fn archive_years(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let years = state.posts.years().await?;
    Ok(Json(serde_json::json!({ "success": true, "years": years })))
}

// GET /api/blog/archive/:year
pub async fn archive_months(
    State(state): State<Arc<AppState>>,
    Path(year): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let months = state.posts.months(year).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "year": year,
        "months": months,
    })))
}

// GET /api/blog/archive/:year/:month
pub async fn archive_posts(
    State(state): State<Arc<AppState>>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(format!(
            "Month must be between 1 and 12, got {month}"
        )));
    }
    let posts = state.posts.by_month(year, month).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "year": year,
        "month": month,
        "count": posts.len(),
        "posts": posts,
    })))
}
