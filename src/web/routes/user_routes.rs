use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::db::entities::user;
use crate::db::repositories::UserRepository;
use crate::web::models::{CreateUserRequest, UpdateUserRequest};
use crate::web::{AppError, AppState};

pub fn create_users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users_handler).post(create_user_handler))
        .route(
            "/{user_id}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
}

fn user_not_found(user_id: i32) -> AppError {
    AppError::NotFound(format!("User {user_id} not found"))
}

async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<user::Model>>, AppError> {
    let users = app_state
        .session
        .unit_of_work(|txn| Box::pin(async move { UserRepository::get_all(txn).await }))
        .await?;
    Ok(Json(users))
}

async fn create_user_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<user::Model>), AppError> {
    let new_user = payload.into_new_user()?;
    let created = app_state
        .session
        .unit_of_work(|txn| Box::pin(async move { UserRepository::create(txn, new_user).await }))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_user_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<user::Model>, AppError> {
    app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { UserRepository::get_by_id(txn, user_id).await })
        })
        .await?
        .map(Json)
        .ok_or_else(|| user_not_found(user_id))
}

async fn update_user_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<user::Model>, AppError> {
    let changes = payload.into_changes()?;
    app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { UserRepository::update(txn, user_id, changes).await })
        })
        .await?
        .map(Json)
        .ok_or_else(|| user_not_found(user_id))
}

async fn delete_user_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let deleted = app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { UserRepository::delete(txn, user_id).await })
        })
        .await?;
    if !deleted {
        return Err(user_not_found(user_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
