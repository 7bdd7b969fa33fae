//! OpenAPI document aggregation.

use utoipa::OpenApi;

/// Public OpenAPI surface used by Swagger UI and tooling.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::inbound::http::friends::send_friend_request,
        crate::inbound::http::friends::accept_friend_request,
        crate::inbound::http::friends::decline_friend_request,
        crate::inbound::http::friends::remove_friend,
        crate::inbound::http::friends::block_user,
        crate::inbound::http::friends::unblock_user,
        crate::inbound::http::friends::list_friends,
        crate::inbound::http::friends::list_pending_requests,
        crate::inbound::http::friends::list_sent_requests,
        crate::inbound::http::friends::list_blocked_users,
        crate::inbound::http::friends::search_users,
        crate::inbound::http::friends::friend_stats,
        crate::inbound::http::collaborators::add_collaborators,
    ),
    components(schemas(
        crate::domain::Error,
        crate::domain::ErrorCode,
        crate::domain::User,
        crate::domain::RelationshipStatus,
        crate::domain::RelationshipTally,
        crate::domain::SkipReason,
        crate::domain::ports::RelationshipActionResponse,
        crate::domain::ports::UserMatch,
        crate::inbound::http::friends::FriendActionBody,
        crate::inbound::http::friends::UserListResponse,
        crate::inbound::http::collaborators::AddCollaboratorsBody,
        crate::inbound::http::collaborators::CopyOptionsBody,
        crate::inbound::http::collaborators::AddCollaboratorsResponse,
        crate::inbound::http::collaborators::InviteeEntry,
        crate::inbound::http::collaborators::OutcomeSummary,
    )),
    tags(
        (name = "friends", description = "Friend request state machine"),
        (name = "collaborators", description = "Deadline collaboration fan-out")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[test]
    fn document_includes_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.ends_with("/friends/request")));
        assert!(paths.iter().any(|p| p.ends_with("/friends/{friendId}")));
        assert!(
            paths
                .iter()
                .any(|p| p.ends_with("/deadlines/{deadlineId}/collaborators"))
        );
    }
}
