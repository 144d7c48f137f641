use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

use crate::db::seed::run_seed;
use crate::web::models::SeedResponse;
use crate::web::{AppError, AppState};

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new().route("/seed", post(seed_handler))
}

async fn seed_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SeedResponse>, AppError> {
    let response = if run_seed(&app_state.session).await? {
        SeedResponse {
            status: "ok",
            message: "Seed data inserted.",
        }
    } else {
        SeedResponse {
            status: "skipped",
            message: "Users already exist; nothing was inserted.",
        }
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use crate::web::test_support::{send, test_router};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn seed_runs_once() {
        let router = test_router().await;

        let (status, body) = send(&router, "POST", "/api/v1/admin/seed", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = send(&router, "POST", "/api/v1/admin/seed", None).await;
        assert_eq!(body["status"], "skipped");

        let (_, users) = send(&router, "GET", "/api/v1/users", None).await;
        assert_eq!(users.as_array().unwrap().len(), 2);
    }
}
