//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain driving ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{CollaborationCommand, RelationshipCommand, RelationshipQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Relationship mutations.
    pub relationships: Arc<dyn RelationshipCommand>,
    /// Relationship reads.
    pub relationship_queries: Arc<dyn RelationshipQuery>,
    /// Collaboration fan-out.
    pub collaboration: Arc<dyn CollaborationCommand>,
}

impl HttpState {
    /// Construct state from the three driving ports.
    pub fn new(
        relationships: Arc<dyn RelationshipCommand>,
        relationship_queries: Arc<dyn RelationshipQuery>,
        collaboration: Arc<dyn CollaborationCommand>,
    ) -> Self {
        Self {
            relationships,
            relationship_queries,
            collaboration,
        }
    }
}
