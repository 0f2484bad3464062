use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use ff_core::{DateStatus, NormalizedArticle};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::mailer::{ContactEmail, ContactSubmission};
use crate::AppState;

pub const DEFAULT_RECENT_LIMIT: usize = 20;
pub const MAX_RECENT_LIMIT: usize = 100;

/// Answers bare `OPTIONS` requests; CORS headers come from the layer.
pub async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Runs the full ingest pipeline.
pub async fn fetch_and_process(State(state): State<AppState>) -> impl IntoResponse {
    info!("📰 Ingest triggered over HTTP");
    match state.pipeline.ingest().await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "processed": report.processed(),
                "candidates": report.candidates,
                "dropped": report.dropped,
                "articles": report.articles,
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Ingest run failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Article as the read-only preview shows it. `timeAgo` keeps the feed's
/// own label next to the resolved timestamp.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewArticle {
    pub title: String,
    pub description: String,
    pub url: String,
    pub author: String,
    pub time_ago: String,
    pub published_at: DateTime<Utc>,
    pub date_status: DateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<NormalizedArticle> for PreviewArticle {
    fn from(article: NormalizedArticle) -> Self {
        Self {
            title: article.title,
            description: article.description,
            url: article.url,
            author: article.author,
            time_ago: article.published_label,
            published_at: article.published_at,
            date_status: article.date_status,
            image: article.image_url,
        }
    }
}

pub async fn fetch_preview(State(state): State<AppState>) -> impl IntoResponse {
    match state.preview.preview().await {
        Ok(articles) => {
            let articles: Vec<PreviewArticle> = articles.into_iter().map(Into::into).collect();
            info!("Preview found {} articles", articles.len());
            (StatusCode::OK, Json(json!({ "articles": articles }))).into_response()
        }
        Err(e) => {
            error!("Preview failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn send_contact_email(
    State(state): State<AppState>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> impl IntoResponse {
    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => {
            warn!("Unreadable contact form: {}", rejection);
            return contact_failure(rejection.body_text());
        }
    };
    info!(
        full_name = %submission.full_name,
        email = %submission.email,
        country = %submission.country,
        "Received contact form submission"
    );
    if let Err(e) = submission.validate() {
        return contact_failure(e.to_string());
    }

    let email = ContactEmail::from_submission(&submission, &state.contact_recipient);
    match state.mailer.send(&email).await {
        Ok(data) => {
            (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response()
        }
        Err(e) => {
            error!("Contact email failed: {}", e);
            contact_failure(e.to_string())
        }
    }
}

fn contact_failure(message: String) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Most recent stored articles. Never fails: an unreadable query uses the
/// default limit and storage errors give an empty list.
pub async fn recent_articles(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> impl IntoResponse {
    let requested = match query {
        Ok(Query(params)) => params.limit,
        Err(rejection) => {
            warn!("Ignoring recent articles query: {}", rejection);
            None
        }
    };
    let limit = requested.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT);

    let articles = match &state.storage {
        Some(storage) => match storage.recent_articles(limit).await {
            Ok(articles) => articles,
            Err(e) => {
                error!("Failed to load recent articles: {}", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    (StatusCode::OK, Json(json!({ "articles": articles })))
}
