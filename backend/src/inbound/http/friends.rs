//! Friends API handlers.
//!
//! ```text
//! POST   /api/v1/friends/request   {"friendId":"<uuid>"}
//! PUT    /api/v1/friends/accept    {"friendId":"<uuid>"}
//! PUT    /api/v1/friends/decline   {"friendId":"<uuid>"}
//! DELETE /api/v1/friends/{friendId}
//! POST   /api/v1/friends/block     {"friendId":"<uuid>"}
//! POST   /api/v1/friends/unblock   {"friendId":"<uuid>"}
//! GET    /api/v1/friends | /pending | /sent | /blocked | /search?q= | /stats
//! ```

use actix_web::{delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::ports::{RelationshipActionRequest, RelationshipActionResponse, UserMatch};
use crate::domain::{Error, RelationshipTally, User, UserId, UserValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Request body naming the other user of a relationship action.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct FriendActionBody {
    /// The user the action is directed at.
    pub friend_id: String,
}

/// Envelope for user list endpoints.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    /// The users in the list.
    pub data: Vec<User>,
    /// Convenience count of `data`.
    pub count: usize,
}

impl From<Vec<User>> for UserListResponse {
    fn from(data: Vec<User>) -> Self {
        let count = data.len();
        Self { data, count }
    }
}

fn parse_friend_id(raw: &str) -> Result<UserId, Error> {
    UserId::new(raw).map_err(map_user_id_error)
}

fn map_user_id_error(err: UserValidationError) -> Error {
    Error::invalid_request(format!("invalid friend id: {err}"))
        .with_details(json!({ "field": "friendId" }))
}

fn action_request(
    session: &SessionContext,
    friend_id: &str,
) -> Result<RelationshipActionRequest, Error> {
    Ok(RelationshipActionRequest {
        acting_user: session.require_user_id()?,
        other_user: parse_friend_id(friend_id)?,
    })
}

/// Send a friend request.
#[utoipa::path(
    post,
    path = "/api/v1/friends/request",
    request_body = FriendActionBody,
    responses(
        (status = 200, description = "Request created", body = RelationshipActionResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "Already pending, friends, or blocked", body = Error)
    ),
    tags = ["friends"],
    operation_id = "sendFriendRequest"
)]
#[post("/friends/request")]
pub async fn send_friend_request(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<FriendActionBody>,
) -> ApiResult<web::Json<RelationshipActionResponse>> {
    let request = action_request(&session, &payload.friend_id)?;
    let response = state.relationships.send_request(request).await?;
    Ok(web::Json(response))
}

/// Accept a pending friend request.
#[utoipa::path(
    put,
    path = "/api/v1/friends/accept",
    request_body = FriendActionBody,
    responses(
        (status = 200, description = "Request accepted", body = RelationshipActionResponse),
        (status = 403, description = "Only the recipient can accept", body = Error),
        (status = 404, description = "No pending request", body = Error),
        (status = 409, description = "State changed concurrently", body = Error)
    ),
    tags = ["friends"],
    operation_id = "acceptFriendRequest"
)]
#[put("/friends/accept")]
pub async fn accept_friend_request(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<FriendActionBody>,
) -> ApiResult<web::Json<RelationshipActionResponse>> {
    let request = action_request(&session, &payload.friend_id)?;
    let response = state.relationships.accept_request(request).await?;
    Ok(web::Json(response))
}

/// Decline a pending friend request.
#[utoipa::path(
    put,
    path = "/api/v1/friends/decline",
    request_body = FriendActionBody,
    responses(
        (status = 200, description = "Request declined", body = RelationshipActionResponse),
        (status = 403, description = "Only the recipient can decline", body = Error),
        (status = 404, description = "No pending request", body = Error)
    ),
    tags = ["friends"],
    operation_id = "declineFriendRequest"
)]
#[put("/friends/decline")]
pub async fn decline_friend_request(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<FriendActionBody>,
) -> ApiResult<web::Json<RelationshipActionResponse>> {
    let request = action_request(&session, &payload.friend_id)?;
    let response = state.relationships.decline_request(request).await?;
    Ok(web::Json(response))
}

/// Remove a friend, or cancel a pending request.
#[utoipa::path(
    delete,
    path = "/api/v1/friends/{friendId}",
    params(("friendId" = String, Path, description = "The other user")),
    responses(
        (status = 200, description = "Relationship removed", body = RelationshipActionResponse),
        (status = 404, description = "Nothing to remove", body = Error),
        (status = 409, description = "Relationship is blocked", body = Error)
    ),
    tags = ["friends"],
    operation_id = "removeFriend"
)]
#[delete("/friends/{friend_id}")]
pub async fn remove_friend(
    session: SessionContext,
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<RelationshipActionResponse>> {
    let request = action_request(&session, &path.into_inner())?;
    let response = state.relationships.remove_friend(request).await?;
    Ok(web::Json(response))
}

/// Block a user, overwriting any non-blocked relationship state.
#[utoipa::path(
    post,
    path = "/api/v1/friends/block",
    request_body = FriendActionBody,
    responses(
        (status = 200, description = "User blocked", body = RelationshipActionResponse),
        (status = 409, description = "Already blocked", body = Error)
    ),
    tags = ["friends"],
    operation_id = "blockUser"
)]
#[post("/friends/block")]
pub async fn block_user(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<FriendActionBody>,
) -> ApiResult<web::Json<RelationshipActionResponse>> {
    let request = action_request(&session, &payload.friend_id)?;
    let response = state.relationships.block_user(request).await?;
    Ok(web::Json(response))
}

/// Lift a block placed by the calling user.
#[utoipa::path(
    post,
    path = "/api/v1/friends/unblock",
    request_body = FriendActionBody,
    responses(
        (status = 200, description = "Block lifted", body = RelationshipActionResponse),
        (status = 403, description = "Only the blocker can unblock", body = Error),
        (status = 404, description = "No block to lift", body = Error)
    ),
    tags = ["friends"],
    operation_id = "unblockUser"
)]
#[post("/friends/unblock")]
pub async fn unblock_user(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<FriendActionBody>,
) -> ApiResult<web::Json<RelationshipActionResponse>> {
    let request = action_request(&session, &payload.friend_id)?;
    let response = state.relationships.unblock_user(request).await?;
    Ok(web::Json(response))
}

/// List accepted friends.
#[utoipa::path(
    get,
    path = "/api/v1/friends",
    responses(
        (status = 200, description = "Friends", body = UserListResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["friends"],
    operation_id = "listFriends"
)]
#[get("/friends")]
pub async fn list_friends(
    session: SessionContext,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<UserListResponse>> {
    let user = session.require_user_id()?;
    let friends = state.relationship_queries.list_friends(&user).await?;
    Ok(web::Json(friends.into()))
}

/// List incoming pending friend requests.
#[utoipa::path(
    get,
    path = "/api/v1/friends/pending",
    responses(
        (status = 200, description = "Pending requests", body = UserListResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["friends"],
    operation_id = "listPendingRequests"
)]
#[get("/friends/pending")]
pub async fn list_pending_requests(
    session: SessionContext,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<UserListResponse>> {
    let user = session.require_user_id()?;
    let pending = state.relationship_queries.list_pending(&user).await?;
    Ok(web::Json(pending.into()))
}

/// List outgoing pending friend requests.
#[utoipa::path(
    get,
    path = "/api/v1/friends/sent",
    responses(
        (status = 200, description = "Sent requests", body = UserListResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["friends"],
    operation_id = "listSentRequests"
)]
#[get("/friends/sent")]
pub async fn list_sent_requests(
    session: SessionContext,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<UserListResponse>> {
    let user = session.require_user_id()?;
    let sent = state.relationship_queries.list_sent(&user).await?;
    Ok(web::Json(sent.into()))
}

/// List users blocked by the caller.
#[utoipa::path(
    get,
    path = "/api/v1/friends/blocked",
    responses(
        (status = 200, description = "Blocked users", body = UserListResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["friends"],
    operation_id = "listBlockedUsers"
)]
#[get("/friends/blocked")]
pub async fn list_blocked_users(
    session: SessionContext,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<UserListResponse>> {
    let user = session.require_user_id()?;
    let blocked = state.relationship_queries.list_blocked(&user).await?;
    Ok(web::Json(blocked.into()))
}

/// Query string for the friend search endpoint.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Case-insensitive substring matched against usernames and full names.
    pub q: String,
}

/// Search the directory for users to befriend.
#[utoipa::path(
    get,
    path = "/api/v1/friends/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matches with relationship status", body = [UserMatch]),
        (status = 400, description = "Empty search term", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["friends"],
    operation_id = "searchUsers"
)]
#[get("/friends/search")]
pub async fn search_users(
    session: SessionContext,
    state: web::Data<HttpState>,
    query: web::Query<SearchQuery>,
) -> ApiResult<web::Json<Vec<UserMatch>>> {
    let user = session.require_user_id()?;
    let matches = state
        .relationship_queries
        .search_users(&user, &query.q)
        .await?;
    Ok(web::Json(matches))
}

/// Summarize the caller's relationship counts.
#[utoipa::path(
    get,
    path = "/api/v1/friends/stats",
    responses(
        (status = 200, description = "Relationship tallies", body = RelationshipTally),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["friends"],
    operation_id = "friendStats"
)]
#[get("/friends/stats")]
pub async fn friend_stats(
    session: SessionContext,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<RelationshipTally>> {
    let user = session.require_user_id()?;
    let stats = state.relationship_queries.friend_stats(&user).await?;
    Ok(web::Json(stats))
}

/// Mount every friends route on the given scope.
pub fn configure(config: &mut web::ServiceConfig) {
    config
        .service(send_friend_request)
        .service(accept_friend_request)
        .service(decline_friend_request)
        .service(block_user)
        .service(unblock_user)
        // Literal paths must register ahead of the `{friend_id}` matcher.
        .service(list_pending_requests)
        .service(list_sent_requests)
        .service(list_blocked_users)
        .service(search_users)
        .service(friend_stats)
        .service(list_friends)
        .service(remove_friend);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test as actix_test, web};
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::RelationshipStatus;
    use crate::domain::ports::{
        MockCollaborationCommand, MockRelationshipCommand, MockRelationshipQuery,
    };
    use crate::inbound::http::test_utils::test_session_middleware;

    const ACTING: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
    const OTHER: &str = "d9b2d63d-a233-4123-847a-7b1c1b1c1b1c";

    fn state(
        relationships: MockRelationshipCommand,
        queries: MockRelationshipQuery,
    ) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(
            Arc::new(relationships),
            Arc::new(queries),
            Arc::new(MockCollaborationCommand::new()),
        ))
    }

    async fn call(
        state: web::Data<HttpState>,
        build: impl Fn(&str) -> actix_test::TestRequest,
        login: bool,
    ) -> (StatusCode, Value) {
        let app = actix_test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .app_data(state)
                .route(
                    "/login",
                    web::get().to(|session: SessionContext| async move {
                        let id = UserId::new(ACTING).expect("fixture id");
                        session.persist_user(&id)?;
                        Ok::<_, Error>(HttpResponse::Ok())
                    }),
                )
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let request = if login {
            let login_res = actix_test::call_service(
                &app,
                actix_test::TestRequest::get().uri("/login").to_request(),
            )
            .await;
            let cookie = login_res
                .response()
                .cookies()
                .find(|cookie| cookie.name() == "session")
                .expect("session cookie set")
                .into_owned();
            build(OTHER).cookie(cookie).to_request()
        } else {
            build(OTHER).to_request()
        };

        let response = actix_test::call_service(&app, request).await;
        let status = response.status();
        let body = actix_test::read_body(response).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, value)
    }

    #[rstest]
    #[actix_web::test]
    async fn send_request_returns_the_new_status() {
        let mut relationships = MockRelationshipCommand::new();
        relationships
            .expect_send_request()
            .times(1)
            .withf(|request| {
                request.acting_user.as_ref() == ACTING && request.other_user.as_ref() == OTHER
            })
            .returning(|_| {
                Ok(RelationshipActionResponse {
                    status: RelationshipStatus::Pending,
                })
            });

        let (status, body) = call(
            state(relationships, MockRelationshipQuery::new()),
            |other| {
                actix_test::TestRequest::post()
                    .uri("/api/v1/friends/request")
                    .set_json(json!({ "friendId": other }))
            },
            true,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "pending" }));
    }

    #[rstest]
    #[actix_web::test]
    async fn requests_without_a_session_are_unauthorised() {
        let relationships = MockRelationshipCommand::new();

        let (status, body) = call(
            state(relationships, MockRelationshipQuery::new()),
            |other| {
                actix_test::TestRequest::post()
                    .uri("/api/v1/friends/request")
                    .set_json(json!({ "friendId": other }))
            },
            false,
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.get("code"), Some(&json!("unauthorized")));
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_friend_ids_are_rejected() {
        let (status, body) = call(
            state(MockRelationshipCommand::new(), MockRelationshipQuery::new()),
            |_| {
                actix_test::TestRequest::post()
                    .uri("/api/v1/friends/request")
                    .set_json(json!({ "friendId": "not-a-uuid" }))
            },
            true,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.get("code"), Some(&json!("invalid_request")));
    }

    #[rstest]
    #[actix_web::test]
    async fn conflicts_surface_as_409_with_the_reason() {
        let mut relationships = MockRelationshipCommand::new();
        relationships
            .expect_send_request()
            .times(1)
            .returning(|_| Err(Error::conflict("a friend request is already pending")));

        let (status, body) = call(
            state(relationships, MockRelationshipQuery::new()),
            |other| {
                actix_test::TestRequest::post()
                    .uri("/api/v1/friends/request")
                    .set_json(json!({ "friendId": other }))
            },
            true,
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body.get("message"),
            Some(&json!("a friend request is already pending"))
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn accept_by_the_initiator_is_forbidden() {
        let mut relationships = MockRelationshipCommand::new();
        relationships
            .expect_accept_request()
            .times(1)
            .returning(|_| {
                Err(Error::forbidden(
                    "only the recipient of a friend request can accept it",
                ))
            });

        let (status, body) = call(
            state(relationships, MockRelationshipQuery::new()),
            |other| {
                actix_test::TestRequest::put()
                    .uri("/api/v1/friends/accept")
                    .set_json(json!({ "friendId": other }))
            },
            true,
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.get("code"), Some(&json!("forbidden")));
    }

    #[rstest]
    #[actix_web::test]
    async fn remove_friend_takes_the_id_from_the_path() {
        let mut relationships = MockRelationshipCommand::new();
        relationships
            .expect_remove_friend()
            .times(1)
            .withf(|request| request.other_user.as_ref() == OTHER)
            .returning(|_| {
                Ok(RelationshipActionResponse {
                    status: RelationshipStatus::None,
                })
            });

        let (status, body) = call(
            state(relationships, MockRelationshipQuery::new()),
            |other| actix_test::TestRequest::delete().uri(&format!("/api/v1/friends/{other}")),
            true,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "none" }));
    }

    #[rstest]
    #[actix_web::test]
    async fn friends_list_is_wrapped_in_a_count_envelope() {
        let mut queries = MockRelationshipQuery::new();
        queries.expect_list_friends().times(1).returning(|_| {
            Ok(vec![
                User::try_from_parts(OTHER, "ada_l", "Ada Lovelace", "ada@example.com")
                    .expect("valid user"),
            ])
        });

        let (status, body) = call(
            state(MockRelationshipCommand::new(), queries),
            |_| actix_test::TestRequest::get().uri("/api/v1/friends"),
            true,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("count"), Some(&json!(1)));
        assert_eq!(
            body.pointer("/data/0/username"),
            Some(&json!("ada_l"))
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn stats_endpoint_returns_the_tally() {
        let mut queries = MockRelationshipQuery::new();
        queries.expect_friend_stats().times(1).returning(|_| {
            Ok(RelationshipTally {
                friends: 2,
                pending_received: 1,
                pending_sent: 0,
                blocked: 1,
            })
        });

        let (status, body) = call(
            state(MockRelationshipCommand::new(), queries),
            |_| actix_test::TestRequest::get().uri("/api/v1/friends/stats"),
            true,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "friends": 2,
                "pendingReceived": 1,
                "pendingSent": 0,
                "blocked": 1,
            })
        );
    }
}
