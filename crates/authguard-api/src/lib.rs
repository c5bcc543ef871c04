//! JSON REST API over AuthGuard's document store.
//!
//! Exposes an axum [`Router`] backed by any
//! [`authguard_core::store::DocumentStore`]. Authentication is the caller's
//! responsibility: every request must already carry the caller's
//! [`IdentitySession`](authguard_core::session::IdentitySession) as a request
//! extension.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", authguard_api::api_router(store.clone()))
//! ```

pub mod dashboard;
pub mod error;
pub mod logs;
pub mod policies;
pub mod users;

use std::sync::Arc;

use authguard_core::store::DocumentStore;
use axum::{Router, routing::get};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: DocumentStore + 'static,
{
  Router::new()
    // Users
    .route("/users", get(users::list::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    // Auth logs
    .route("/auth-logs", get(logs::list::<S>).post(logs::append::<S>))
    // Policies
    .route("/policies", get(policies::list::<S>))
    // Dashboard
    .route("/dashboard", get(dashboard::handler::<S>))
    .with_state(store)
}
