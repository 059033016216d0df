//! HTTP service for the depot document store.
//!
//! [`build_router`] exposes a [`Store`] over JSON: bins, documents and their
//! history, index definitions, searches, sync summaries and retention.
//! When [`AppState::users`] is set every route requires HTTP basic
//! authentication. [`serve`] runs the router over HTTP or HTTPS.

pub mod auth;
pub mod config;
pub mod error;
mod handlers;
pub mod logging;
mod server;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use depot_storage::Store;
use std::sync::Arc;

pub use auth::{hash_password, AuthUser, Users};
pub use config::{Config, ConfigError, ServerEntry, ServersConfig};
pub use error::{ApiError, ApiResult};
pub use server::{serve, tls_config};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    /// Accounts for basic authentication; `None` leaves the service open.
    pub users: Option<Arc<Users>>,
}

impl AppState {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store, users: None }
    }

    #[must_use]
    pub fn with_users(mut self, users: Users) -> Self {
        self.users = Some(Arc::new(users));
        self
    }
}

/// Build the HTTP API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::list_bins))
        .route("/_ping", get(handlers::ping))
        .route("/_sync", get(handlers::summary_all))
        .route("/_cleanup", get(handlers::cleanup_all))
        .route(
            "/{bin}",
            get(handlers::list_items)
                .post(handlers::create_item)
                .delete(handlers::delete_bin),
        )
        .route("/{bin}/_sync", get(handlers::summary_bin))
        .route("/{bin}/_cleanup", get(handlers::cleanup_bin))
        .route("/{bin}/_config", get(handlers::get_config).put(handlers::put_config))
        .route("/{bin}/_index", get(handlers::get_index).put(handlers::put_index))
        .route("/{bin}/_index/values", get(handlers::index_values))
        .route("/{bin}/_search", get(handlers::search_query).post(handlers::search_body))
        .route(
            "/{bin}/{id}",
            get(handlers::get_item)
                .put(handlers::put_item)
                .patch(handlers::patch_item)
                .delete(handlers::delete_item),
        )
        .route("/{bin}/{id}/_history", get(handlers::history))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
        .with_state(state)
}
