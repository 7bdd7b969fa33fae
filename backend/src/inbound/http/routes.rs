//! Route assembly for the HTTP API.

use actix_web::web;

use super::{collaborators, friends};

/// Register every `/api/v1` route on the given service config.
///
/// The caller owns the enclosing scope and its middleware (sessions,
/// tracing), so tests can mount the same routes behind test middleware.
pub fn configure_api(config: &mut web::ServiceConfig) {
    friends::configure(config);
    collaborators::configure(config);
}
