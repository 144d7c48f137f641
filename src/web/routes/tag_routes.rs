use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::db::entities::tag;
use crate::db::error::StorageError;
use crate::db::repositories::TagRepository;
use crate::web::models::{CreateTagRequest, UserScope};
use crate::web::{AppError, AppState};

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tags_handler).post(create_tag_handler))
        .route("/{tag_id}", get(get_tag_handler).delete(delete_tag_handler))
}

fn tag_not_found(tag_id: i32) -> AppError {
    AppError::NotFound(format!("Tag {tag_id} not found"))
}

async fn list_tags_handler(
    State(app_state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
) -> Result<Json<Vec<tag::Model>>, AppError> {
    let user_id = scope.user_id;
    let tags = app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { TagRepository::list(txn, user_id).await })
        })
        .await?;
    Ok(Json(tags))
}

async fn create_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<tag::Model>), AppError> {
    let user_id = scope.user_id;
    let name = payload.validated_name()?;
    let created = app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { TagRepository::create(txn, user_id, &name).await })
        })
        .await
        .map_err(|err| match err {
            StorageError::UniqueViolation(_) => {
                AppError::Conflict("A tag with this name already exists.".to_string())
            }
            other => other.into(),
        })?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    Query(scope): Query<UserScope>,
) -> Result<Json<tag::Model>, AppError> {
    let user_id = scope.user_id;
    app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { TagRepository::get(txn, tag_id, user_id).await })
        })
        .await?
        .map(Json)
        .ok_or_else(|| tag_not_found(tag_id))
}

async fn delete_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    Query(scope): Query<UserScope>,
) -> Result<StatusCode, AppError> {
    let user_id = scope.user_id;
    let deleted = app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { TagRepository::delete(txn, tag_id, user_id).await })
        })
        .await?;
    if !deleted {
        return Err(tag_not_found(tag_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
