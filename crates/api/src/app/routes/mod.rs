use axum::{Router, routing::get};

pub mod admin;
pub mod auth;
pub mod buyer;
pub mod common;
pub mod notifications;
pub mod public;
pub mod supplier;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/supplier", supplier::router())
        .nest("/buyer", buyer::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
}
