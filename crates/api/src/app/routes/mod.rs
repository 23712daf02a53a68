use axum::{routing::get, Router};

pub mod advice;
pub mod categories;
pub mod common;
pub mod dashboard;
pub mod events;
pub mod inventory;
pub mod products;
pub mod purchases;
pub mod suppliers;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/suppliers", suppliers::router())
        .nest("/inventory", inventory::router())
        .nest("/purchases", purchases::router())
        .nest("/dashboard", dashboard::router())
        .nest("/advice", advice::router())
        .nest("/events", events::router())
}
