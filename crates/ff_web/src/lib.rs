use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod mailer;
pub mod state;

pub use mailer::{ContactMailer, ContactSubmission, LoggingMailer};
pub use state::AppState;

pub const INGEST_PATH: &str = "/functions/v1/fetch-and-process-crypto-news";
pub const PREVIEW_PATH: &str = "/functions/v1/fetch-crypto-news";
pub const CONTACT_PATH: &str = "/functions/v1/send-contact-email";
pub const RECENT_PATH: &str = "/api/articles";

/// Permissive CORS for the browser front end.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            INGEST_PATH,
            get(handlers::fetch_and_process)
                .post(handlers::fetch_and_process)
                .options(handlers::preflight),
        )
        .route(
            PREVIEW_PATH,
            get(handlers::fetch_preview)
                .post(handlers::fetch_preview)
                .options(handlers::preflight),
        )
        .route(
            CONTACT_PATH,
            post(handlers::send_contact_email).options(handlers::preflight),
        )
        .route(RECENT_PATH, get(handlers::recent_articles).options(handlers::preflight))
        .fallback(not_found)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> impl axum::response::IntoResponse {
    (
        axum::http::StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({ "error": "not found" })),
    )
}

pub mod prelude {
    pub use super::{create_app, AppState};
    pub use ff_core::{Error, Result};
}
