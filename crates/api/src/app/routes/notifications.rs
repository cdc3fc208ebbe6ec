//! Per-user notification feed.
//!
//! Notifications are derived records; the only mutations here are read-flag
//! flips and deletes against the caller's own feed.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use tradepost_notifications::NotificationId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/read-all", post(read_all))
        .route("/:id/read", post(mark_read))
        .route("/:id", delete(remove))
}

fn parse_id(id: &str) -> Result<NotificationId, axum::response::Response> {
    uuid::Uuid::parse_str(id)
        .map(NotificationId::from_uuid)
        .map_err(|_| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                "invalid notification id",
            )
        })
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let feed = &services.projections().feed;
    let items = feed
        .for_user(principal.user_id())
        .into_iter()
        .map(dto::notification_to_json)
        .collect::<Vec<_>>();
    let unread = feed.unread_count(principal.user_id());

    (
        StatusCode::OK,
        Json(serde_json::json!({ "items": items, "unread": unread })),
    )
        .into_response()
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if services
        .projections()
        .feed
        .mark_read(principal.user_id(), id)
    {
        StatusCode::OK.into_response()
    } else {
        errors::json_error(StatusCode::NOT_FOUND, "not_found", "notification not found")
    }
}

pub async fn read_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let marked = services
        .projections()
        .feed
        .mark_all_read(principal.user_id());

    (StatusCode::OK, Json(serde_json::json!({ "marked": marked }))).into_response()
}

pub async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if services.projections().feed.delete(principal.user_id(), id) {
        StatusCode::OK.into_response()
    } else {
        errors::json_error(StatusCode::NOT_FOUND, "not_found", "notification not found")
    }
}
