use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::Query as MultiQuery;
use std::sync::Arc;

use crate::db::models::ItemWithTags;
use crate::db::repositories::ItemRepository;
use crate::web::models::{
    CreateItemRequest, ListItemsQuery, ReplaceTagsRequest, UpdateItemRequest, UserScope,
};
use crate::web::{AppError, AppState};

pub fn create_items_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_items_handler).post(create_item_handler))
        .route(
            "/{item_id}",
            get(get_item_handler)
                .patch(update_item_handler)
                .delete(delete_item_handler),
        )
        .route("/{item_id}/tags", put(replace_item_tags_handler))
}

fn item_not_found(item_id: i32) -> AppError {
    AppError::NotFound(format!("Item {item_id} not found"))
}

// `tags` repeats in the query string, which the plain axum extractor
// cannot collect into a Vec.
async fn list_items_handler(
    State(app_state): State<Arc<AppState>>,
    MultiQuery(query): MultiQuery<ListItemsQuery>,
) -> Result<Json<Vec<ItemWithTags>>, AppError> {
    let user_id = query.user_id;
    let filter = query.filter();
    let sort = query.sort()?;
    let page = query.pagination()?;

    let items = app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { ItemRepository::list(txn, user_id, &filter, sort, page).await })
        })
        .await?;
    Ok(Json(items))
}

async fn create_item_handler(
    State(app_state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemWithTags>), AppError> {
    let user_id = scope.user_id;
    let new_item = payload.into_new_item()?;
    let created = app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { ItemRepository::create(txn, user_id, new_item).await })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_item_handler(
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
    Query(scope): Query<UserScope>,
) -> Result<Json<ItemWithTags>, AppError> {
    let user_id = scope.user_id;
    app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { ItemRepository::get(txn, item_id, user_id).await })
        })
        .await?
        .map(Json)
        .ok_or_else(|| item_not_found(item_id))
}

async fn update_item_handler(
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
    Query(scope): Query<UserScope>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ItemWithTags>, AppError> {
    let user_id = scope.user_id;
    let (changes, tag_ids) = payload.into_changes()?;
    app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move {
                ItemRepository::update(txn, item_id, user_id, changes, tag_ids).await
            })
        })
        .await?
        .map(Json)
        .ok_or_else(|| item_not_found(item_id))
}

async fn replace_item_tags_handler(
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
    Query(scope): Query<UserScope>,
    Json(payload): Json<ReplaceTagsRequest>,
) -> Result<Json<ItemWithTags>, AppError> {
    let user_id = scope.user_id;
    let tag_ids = payload.tag_ids;
    app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move {
                ItemRepository::update_tags(txn, item_id, user_id, &tag_ids).await
            })
        })
        .await?
        .map(Json)
        .ok_or_else(|| item_not_found(item_id))
}

async fn delete_item_handler(
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
    Query(scope): Query<UserScope>,
) -> Result<StatusCode, AppError> {
    let user_id = scope.user_id;
    let deleted = app_state
        .session
        .unit_of_work(move |txn| {
            Box::pin(async move { ItemRepository::delete(txn, item_id, user_id).await })
        })
        .await?;
    if !deleted {
        return Err(item_not_found(item_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
