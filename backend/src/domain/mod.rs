//! Domain entities, value types, and services.
//!
//! Purpose: hold the two engines with real invariants, the relationship
//! state machine and the deadline collaboration fan-out, together with the
//! strongly typed entities they operate on and the ports they talk through.
//! Types are immutable where practical and document their invariants and
//! serialisation contracts in each type's Rustdoc.

pub mod collaboration;
pub mod collaboration_service;
pub mod deadline;
pub mod error;
pub mod notification;
pub mod ports;
pub mod relationship;
pub mod relationship_service;
mod retry;
pub mod user;

pub use self::collaboration::{
    CollaborationOptions, CollaborationOutcome, DEFAULT_TITLE_SUFFIX, InviteeOutcome,
    InviteeReport, SkipReason,
};
pub use self::collaboration_service::CollaborationService;
pub use self::deadline::{
    CollaboratorAttachment, CollaboratorRole, Deadline, DeadlinePriority, DeadlineStatus,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::notification::NotificationIntent;
pub use self::relationship::{
    InitiatorOutsidePairError, PairKey, RelationshipEdge, RelationshipState, RelationshipStatus,
    RelationshipTally, SelfRelationshipError,
};
pub use self::relationship_service::RelationshipService;
pub use self::user::{User, UserId, UserValidationError, Username};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
