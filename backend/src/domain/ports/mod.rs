//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod collaboration_command;
mod deadline_repository;
mod notification_queue;
mod relationship_command;
mod relationship_query;
mod relationship_repository;
mod user_directory;

#[cfg(test)]
pub use collaboration_command::MockCollaborationCommand;
pub use collaboration_command::{AddCollaboratorsRequest, CollaborationCommand};
#[cfg(test)]
pub use deadline_repository::MockDeadlineRepository;
pub use deadline_repository::{AttachOutcome, DeadlineRepository, DeadlineRepositoryError};
#[cfg(test)]
pub use notification_queue::MockNotificationQueue;
pub use notification_queue::{
    FixtureNotificationQueue, NotificationQueue, NotificationQueueError,
};
#[cfg(test)]
pub use relationship_command::MockRelationshipCommand;
pub use relationship_command::{
    RelationshipActionRequest, RelationshipActionResponse, RelationshipCommand,
};
#[cfg(test)]
pub use relationship_query::MockRelationshipQuery;
pub use relationship_query::{RelationshipQuery, UserMatch};
#[cfg(test)]
pub use relationship_repository::MockRelationshipRepository;
pub use relationship_repository::{
    EdgeChange, EdgeInsert, RelationshipRepository, RelationshipRepositoryError,
};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{UserDirectory, UserDirectoryError};
