//! Deadline collaboration backend.
//!
//! Two engines make up the core: the relationship state machine governing
//! friend requests, blocks, and removals between users, and the deadline
//! collaboration fan-out that attaches invitees and materializes per-invitee
//! copies. Everything else is adapters around those engines, arranged
//! hexagonally:
//!
//! - [`domain`]: entities, value types, services, and ports.
//! - [`inbound`]: HTTP handlers driving the engines.
//! - [`outbound`]: Diesel/PostgreSQL and queue adapters driven by them.
//! - [`server`]: configuration and actix assembly.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
