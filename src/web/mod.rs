use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::SessionManager;
use crate::web::routes::{admin_routes, item_routes, tag_routes, user_routes};

pub mod error;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(session: Arc<SessionManager>) -> Router {
    let app_state = Arc::new(AppState { session });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api_v1 = Router::new()
        .nest("/admin", admin_routes::create_admin_router())
        .nest("/users", user_routes::create_users_router())
        .nest("/tags", tag_routes::create_tags_router())
        .nest("/items", item_routes::create_items_router());

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::db::test_support::memory_session;

    pub async fn test_router() -> Router {
        super::create_axum_router(Arc::new(memory_session().await))
    }

    /// Sends one request and returns the status with the parsed JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }
}
