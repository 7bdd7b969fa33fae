//! Deadline collaborators API handler.
//!
//! ```text
//! POST /api/v1/deadlines/{deadlineId}/collaborators
//! {"collaborators":["<uuid>"],"createCopies":true,
//!  "copyOptions":{"titleSuffix":" (My Copy)","createIndividualCopies":true,
//!                 "notifyCollaborators":true}}
//! ```
//!
//! Partial success is response data, not an error: the call returns `200 OK`
//! even when every invitee was skipped, and the client inspects the skip
//! entries to compose its message.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::ports::AddCollaboratorsRequest;
use crate::domain::{
    CollaborationOptions, CollaborationOutcome, Error, InviteeOutcome, SkipReason, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Copy-related options of an add-collaborators call.
///
/// Absent fields fall back to the engine defaults.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct CopyOptionsBody {
    /// Suffix appended to copy titles.
    pub title_suffix: Option<String>,
    /// Give each invitee their own copy.
    pub create_individual_copies: Option<bool>,
    /// Enqueue a notification intent per attached invitee.
    pub notify_collaborators: Option<bool>,
}

/// Request body for the add-collaborators endpoint.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct AddCollaboratorsBody {
    /// Proposed collaborator user ids.
    pub collaborators: Vec<String>,
    /// Materialize copies at all; defaults to true.
    pub create_copies: Option<bool>,
    /// Copy behaviour knobs.
    #[serde(default)]
    pub copy_options: CopyOptionsBody,
}

impl AddCollaboratorsBody {
    fn into_options(self) -> (Vec<String>, CollaborationOptions) {
        let defaults = CollaborationOptions::default();
        let options = CollaborationOptions {
            create_copies: self.create_copies.unwrap_or(defaults.create_copies),
            title_suffix: self
                .copy_options
                .title_suffix
                .unwrap_or(defaults.title_suffix),
            create_individual_copies: self
                .copy_options
                .create_individual_copies
                .unwrap_or(defaults.create_individual_copies),
            notify_collaborators: self
                .copy_options
                .notify_collaborators
                .unwrap_or(defaults.notify_collaborators),
        };
        (self.collaborators, options)
    }
}

/// Per-invitee entry of the response payload.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteeEntry {
    /// The invitee this entry describes.
    pub user_id: String,
    /// Either `added` or `skipped`.
    pub outcome: String,
    /// Identifier of the copy created for the invitee, when one was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_id: Option<Uuid>,
    /// Stable machine-readable skip reason code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    /// Human-readable skip description for direct display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Summary counts of the response payload.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSummary {
    /// Number of deduplicated invitees processed.
    pub requested_count: usize,
    /// Number of invitees attached.
    pub added_count: usize,
    /// Number of invitees skipped.
    pub skipped_count: usize,
}

/// Response payload of the add-collaborators endpoint.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCollaboratorsResponse {
    /// Whether at least one invitee was attached.
    pub success: bool,
    /// Per-invitee outcomes in input order.
    pub collaborators: Vec<InviteeEntry>,
    /// Summary counts.
    pub summary: OutcomeSummary,
}

/// Client-facing description of a skip reason.
///
/// The core deals only in [`SkipReason`] codes; the strings live here at the
/// presentation boundary.
fn skip_message(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::OwnerInvited => "cannot add the owner as a collaborator",
        SkipReason::AlreadyCollaborator => "already a collaborator",
        SkipReason::NotFriends => "not friends",
        SkipReason::UserBlocked => "user is blocked",
        SkipReason::Unprocessed => "could not be processed, try again",
    }
}

impl From<CollaborationOutcome> for AddCollaboratorsResponse {
    fn from(outcome: CollaborationOutcome) -> Self {
        let collaborators = outcome
            .invitees
            .into_iter()
            .map(|report| match report.outcome {
                InviteeOutcome::Added { copy_id } => InviteeEntry {
                    user_id: report.user_id.to_string(),
                    outcome: "added".to_owned(),
                    copy_id,
                    reason: None,
                    message: None,
                },
                InviteeOutcome::Skipped { reason } => InviteeEntry {
                    user_id: report.user_id.to_string(),
                    outcome: "skipped".to_owned(),
                    copy_id: None,
                    reason: Some(reason),
                    message: Some(skip_message(reason).to_owned()),
                },
            })
            .collect();
        Self {
            success: outcome.success,
            collaborators,
            summary: OutcomeSummary {
                requested_count: outcome.requested_count,
                added_count: outcome.added_count,
                skipped_count: outcome.skipped_count,
            },
        }
    }
}

fn parse_invitees(raw: Vec<String>) -> Result<Vec<UserId>, Error> {
    raw.into_iter()
        .map(|id| {
            UserId::new(&id).map_err(|err| {
                Error::invalid_request(format!("invalid collaborator id: {err}"))
                    .with_details(json!({ "field": "collaborators", "value": id }))
            })
        })
        .collect()
}

/// Attach invitees to a deadline, optionally materializing copies.
#[utoipa::path(
    post,
    path = "/api/v1/deadlines/{deadlineId}/collaborators",
    params(("deadlineId" = Uuid, Path, description = "The deadline being shared")),
    request_body = AddCollaboratorsBody,
    responses(
        (status = 200, description = "Fan-out outcome, including skips", body = AddCollaboratorsResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller does not own the deadline", body = Error),
        (status = 404, description = "Deadline not found", body = Error)
    ),
    tags = ["collaborators"],
    operation_id = "addCollaborators"
)]
#[post("/deadlines/{deadline_id}/collaborators")]
pub async fn add_collaborators(
    session: SessionContext,
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
    payload: web::Json<AddCollaboratorsBody>,
) -> ApiResult<web::Json<AddCollaboratorsResponse>> {
    let acting_user = session.require_user_id()?;
    let deadline_id = path.into_inner();
    let (raw_invitees, options) = payload.into_inner().into_options();
    let invitee_ids = parse_invitees(raw_invitees)?;

    let outcome = state
        .collaboration
        .add_collaborators(AddCollaboratorsRequest {
            deadline_id,
            acting_user,
            invitee_ids,
            options,
        })
        .await?;

    Ok(web::Json(outcome.into()))
}

/// Mount the collaborators route on the given scope.
pub fn configure(config: &mut web::ServiceConfig) {
    config.service(add_collaborators);
}
