//! Tests for the relationship state machine service.

use std::sync::Arc;

use chrono::Utc;
use mockable::DefaultClock;
use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{
    FixtureNotificationQueue, MockNotificationQueue, MockRelationshipRepository,
    MockUserDirectory,
};

fn users() -> (UserId, UserId) {
    (UserId::random(), UserId::random())
}

fn pair(a: &UserId, b: &UserId) -> PairKey {
    PairKey::new(a.clone(), b.clone()).expect("distinct users")
}

fn edge(pair: &PairKey, state: RelationshipState, initiator: &UserId) -> RelationshipEdge {
    let now = Utc::now();
    RelationshipEdge::new(pair.clone(), state, initiator.clone(), now, now)
        .expect("initiator in pair")
}

fn request(acting: &UserId, other: &UserId) -> RelationshipActionRequest {
    RelationshipActionRequest {
        acting_user: acting.clone(),
        other_user: other.clone(),
    }
}

fn service<R, D, N>(
    repo: R,
    directory: D,
    notifications: N,
) -> RelationshipService<R, D, N> {
    RelationshipService::new(
        Arc::new(repo),
        Arc::new(directory),
        Arc::new(notifications),
        Arc::new(DefaultClock),
    )
}

fn quiet_service<R>(repo: R) -> RelationshipService<R, MockUserDirectory, FixtureNotificationQueue>
where
    R: RelationshipRepository,
{
    service(repo, MockUserDirectory::new(), FixtureNotificationQueue)
}

fn sample_user(id: &UserId) -> User {
    User::try_from_parts(id.as_ref(), "sample_user", "Sample User", "sample@example.com")
        .expect("valid user")
}

// --- send ---------------------------------------------------------------

#[tokio::test]
async fn send_request_creates_pending_edge_and_notifies() {
    let (requester, target) = users();
    let expected_pair = pair(&requester, &target);

    let mut repo = MockRelationshipRepository::new();
    let found_pair = expected_pair.clone();
    repo.expect_find()
        .times(1)
        .withf(move |p| p == &found_pair)
        .returning(|_| Ok(None));
    let inserted_requester = requester.clone();
    repo.expect_try_insert()
        .times(1)
        .withf(move |e| {
            e.state() == RelationshipState::Pending && e.initiator() == &inserted_requester
        })
        .returning(|_| Ok(EdgeInsert::Inserted));

    let mut queue = MockNotificationQueue::new();
    let (notified_to, notified_from) = (target.clone(), requester.clone());
    queue
        .expect_enqueue()
        .times(1)
        .withf(move |intent| {
            matches!(
                intent,
                NotificationIntent::FriendRequestReceived { to, from }
                    if to == &notified_to && from == &notified_from
            )
        })
        .returning(|_| Ok(()));

    let svc = service(repo, MockUserDirectory::new(), queue);
    let response = svc
        .send_request(request(&requester, &target))
        .await
        .expect("send succeeds");

    assert_eq!(response.status, RelationshipStatus::Pending);
}

#[tokio::test]
async fn send_request_to_self_is_rejected_before_any_io() {
    let user = UserId::random();
    let svc = quiet_service(MockRelationshipRepository::new());

    let error = svc
        .send_request(request(&user, &user))
        .await
        .expect_err("self request fails");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[case(RelationshipState::Pending, ErrorCode::Conflict)]
#[case(RelationshipState::Accepted, ErrorCode::Conflict)]
#[case(RelationshipState::Blocked, ErrorCode::Conflict)]
#[tokio::test]
async fn send_request_over_existing_edge_conflicts(
    #[case] state: RelationshipState,
    #[case] expected: ErrorCode,
) {
    let (requester, target) = users();
    let existing = edge(&pair(&requester, &target), state, &requester);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_try_insert().times(0);

    let svc = quiet_service(repo);
    let error = svc
        .send_request(request(&requester, &target))
        .await
        .expect_err("duplicate send fails");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[case(true)]
#[case(false)]
#[tokio::test]
async fn send_request_fails_when_blocked_in_either_direction(#[case] blocker_sends: bool) {
    let (blocker, blockee) = users();
    let key = pair(&blocker, &blockee);
    let existing = edge(&key, RelationshipState::Blocked, &blocker);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));

    let svc = quiet_service(repo);
    let req = if blocker_sends {
        request(&blocker, &blockee)
    } else {
        request(&blockee, &blocker)
    };
    let error = svc.send_request(req).await.expect_err("blocked send fails");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn send_request_lost_insert_race_reports_winner_state() {
    let (requester, target) = users();
    let key = pair(&requester, &target);
    let winner = edge(&key, RelationshipState::Pending, &target);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(|_| Ok(None));
    repo.expect_try_insert()
        .times(1)
        .returning(|_| Ok(EdgeInsert::AlreadyExists));
    repo.expect_find().times(1).return_once(move |_| Ok(Some(winner)));

    let svc = quiet_service(repo);
    let error = svc
        .send_request(request(&requester, &target))
        .await
        .expect_err("race loser fails");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

// --- accept / decline ---------------------------------------------------

#[tokio::test]
async fn accept_by_recipient_transitions_to_accepted_and_notifies_requester() {
    let (requester, recipient) = users();
    let key = pair(&requester, &recipient);
    let existing = edge(&key, RelationshipState::Pending, &requester);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_update_if_status()
        .times(1)
        .withf(|_, expected, change| {
            *expected == RelationshipState::Pending
                && change.state == RelationshipState::Accepted
        })
        .returning(|_, _, _| Ok(true));

    let mut queue = MockNotificationQueue::new();
    let (notified_to, notified_by) = (requester.clone(), recipient.clone());
    queue
        .expect_enqueue()
        .times(1)
        .withf(move |intent| {
            matches!(
                intent,
                NotificationIntent::FriendRequestAccepted { to, by }
                    if to == &notified_to && by == &notified_by
            )
        })
        .returning(|_| Ok(()));

    let svc = service(repo, MockUserDirectory::new(), queue);
    let response = svc
        .accept_request(request(&recipient, &requester))
        .await
        .expect("accept succeeds");

    assert_eq!(response.status, RelationshipStatus::Accepted);
}

#[tokio::test]
async fn accept_by_initiator_is_forbidden() {
    let (requester, recipient) = users();
    let key = pair(&requester, &recipient);
    let existing = edge(&key, RelationshipState::Pending, &requester);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_update_if_status().times(0);

    let svc = quiet_service(repo);
    let error = svc
        .accept_request(request(&requester, &recipient))
        .await
        .expect_err("initiator cannot accept");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn accept_without_pending_request_is_not_found() {
    let (a, b) = users();

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(|_| Ok(None));

    let svc = quiet_service(repo);
    let error = svc
        .accept_request(request(&a, &b))
        .await
        .expect_err("nothing to accept");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn accept_when_blocked_conflicts() {
    let (a, b) = users();
    let existing = edge(&pair(&a, &b), RelationshipState::Blocked, &b);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));

    let svc = quiet_service(repo);
    let error = svc
        .accept_request(request(&a, &b))
        .await
        .expect_err("blocked accept fails");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn decline_by_recipient_collapses_back_to_none() {
    let (requester, recipient) = users();
    let key = pair(&requester, &recipient);
    let existing = edge(&key, RelationshipState::Pending, &requester);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_delete_if_status()
        .times(1)
        .withf(|_, expected| *expected == RelationshipState::Pending)
        .returning(|_, _| Ok(true));

    let svc = quiet_service(repo);
    let response = svc
        .decline_request(request(&recipient, &requester))
        .await
        .expect("decline succeeds");

    assert_eq!(response.status, RelationshipStatus::None);
}

#[tokio::test]
async fn decline_by_initiator_is_forbidden() {
    let (requester, recipient) = users();
    let existing = edge(
        &pair(&requester, &recipient),
        RelationshipState::Pending,
        &requester,
    );

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_delete_if_status().times(0);

    let svc = quiet_service(repo);
    let error = svc
        .decline_request(request(&requester, &recipient))
        .await
        .expect_err("initiator cannot decline");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

// --- remove -------------------------------------------------------------

#[tokio::test]
async fn remove_accepted_friendship_uses_cascading_removal() {
    let (a, b) = users();
    let key = pair(&a, &b);
    let existing = edge(&key, RelationshipState::Accepted, &a);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    let removed_pair = key.clone();
    repo.expect_remove_accepted()
        .times(1)
        .withf(move |p| p == &removed_pair)
        .returning(|_| Ok(true));

    let svc = quiet_service(repo);
    let response = svc
        .remove_friend(request(&b, &a))
        .await
        .expect("remove succeeds");

    assert_eq!(response.status, RelationshipStatus::None);
}

#[rstest]
#[case(true)]
#[case(false)]
#[tokio::test]
async fn remove_pending_request_cancels_from_either_side(#[case] sender_removes: bool) {
    let (requester, recipient) = users();
    let existing = edge(
        &pair(&requester, &recipient),
        RelationshipState::Pending,
        &requester,
    );

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_delete_if_status()
        .times(1)
        .withf(|_, expected| *expected == RelationshipState::Pending)
        .returning(|_, _| Ok(true));
    repo.expect_remove_accepted().times(0);

    let svc = quiet_service(repo);
    let req = if sender_removes {
        request(&requester, &recipient)
    } else {
        request(&recipient, &requester)
    };
    let response = svc.remove_friend(req).await.expect("cancel succeeds");

    assert_eq!(response.status, RelationshipStatus::None);
}

#[tokio::test]
async fn remove_without_edge_is_not_found() {
    let (a, b) = users();

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(|_| Ok(None));

    let svc = quiet_service(repo);
    let error = svc
        .remove_friend(request(&a, &b))
        .await
        .expect_err("nothing to remove");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

// --- block / unblock ----------------------------------------------------

#[rstest]
#[case(None)]
#[case(Some(RelationshipState::Pending))]
#[case(Some(RelationshipState::Accepted))]
#[tokio::test]
async fn block_overwrites_any_non_blocked_state(#[case] prior: Option<RelationshipState>) {
    let (blocker, blockee) = users();
    let key = pair(&blocker, &blockee);
    let existing = prior.map(|state| edge(&key, state, &blockee));

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(existing));
    let expected_blocker = blocker.clone();
    repo.expect_overwrite_with_block()
        .times(1)
        .withf(move |_, by, _| by == &expected_blocker)
        .returning(|_, _, _| Ok(()));

    let svc = quiet_service(repo);
    let response = svc
        .block_user(request(&blocker, &blockee))
        .await
        .expect("block succeeds");

    assert_eq!(response.status, RelationshipStatus::Blocked);
}

#[tokio::test]
async fn blocking_an_already_blocked_pair_conflicts() {
    let (blocker, blockee) = users();
    let existing = edge(&pair(&blocker, &blockee), RelationshipState::Blocked, &blocker);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_overwrite_with_block().times(0);

    let svc = quiet_service(repo);
    let error = svc
        .block_user(request(&blockee, &blocker))
        .await
        .expect_err("double block fails");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn unblock_by_blocker_deletes_the_edge() {
    let (blocker, blockee) = users();
    let existing = edge(&pair(&blocker, &blockee), RelationshipState::Blocked, &blocker);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_delete_if_status()
        .times(1)
        .withf(|_, expected| *expected == RelationshipState::Blocked)
        .returning(|_, _| Ok(true));

    let svc = quiet_service(repo);
    let response = svc
        .unblock_user(request(&blocker, &blockee))
        .await
        .expect("unblock succeeds");

    assert_eq!(response.status, RelationshipStatus::None);
}

#[tokio::test]
async fn unblock_by_blockee_is_forbidden() {
    let (blocker, blockee) = users();
    let existing = edge(&pair(&blocker, &blockee), RelationshipState::Blocked, &blocker);

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(move |_| Ok(Some(existing)));
    repo.expect_delete_if_status().times(0);

    let svc = quiet_service(repo);
    let error = svc
        .unblock_user(request(&blockee, &blocker))
        .await
        .expect_err("blockee cannot unblock");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn unblock_without_block_is_not_found() {
    let (a, b) = users();

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find().times(1).return_once(|_| Ok(None));

    let svc = quiet_service(repo);
    let error = svc
        .unblock_user(request(&a, &b))
        .await
        .expect_err("nothing to unblock");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

// --- queries ------------------------------------------------------------

#[tokio::test]
async fn status_between_is_symmetric() {
    let (a, b) = users();
    let key = pair(&a, &b);
    let stored = edge(&key, RelationshipState::Accepted, &a);

    let mut repo = MockRelationshipRepository::new();
    let expected_pair = key.clone();
    repo.expect_find()
        .times(2)
        .withf(move |p| p == &expected_pair)
        .returning(move |_| Ok(Some(stored.clone())));

    let svc = quiet_service(repo);
    let forward = svc.status_between(&a, &b).await.expect("status resolves");
    let reverse = svc.status_between(&b, &a).await.expect("status resolves");

    assert_eq!(forward, RelationshipStatus::Accepted);
    assert_eq!(forward, reverse);
}

#[tokio::test]
async fn pending_lists_split_by_direction() {
    let user = UserId::random();
    let sender = UserId::random();
    let recipient = UserId::random();
    let received = edge(&pair(&sender, &user), RelationshipState::Pending, &sender);
    let sent = edge(&pair(&user, &recipient), RelationshipState::Pending, &user);

    let mut repo = MockRelationshipRepository::new();
    let edges = vec![received, sent];
    repo.expect_list_for_user()
        .times(1)
        .withf(|_, state| *state == RelationshipState::Pending)
        .return_once(move |_, _| Ok(edges));

    let mut directory = MockUserDirectory::new();
    let expected_sender = sender.clone();
    directory
        .expect_find_by_ids()
        .times(1)
        .withf(move |ids| ids == [expected_sender.clone()])
        .returning(|ids| Ok(ids.iter().map(sample_user).collect()));

    let svc = service(repo, directory, FixtureNotificationQueue);
    let pending = svc.list_pending(&user).await.expect("list resolves");

    assert_eq!(pending.len(), 1);
    assert_eq!(pending.first().map(|u| u.id().clone()), Some(sender));
}

#[tokio::test]
async fn blocked_list_only_includes_blocks_the_user_placed() {
    let user = UserId::random();
    let victim = UserId::random();
    let aggressor = UserId::random();
    let placed = edge(&pair(&user, &victim), RelationshipState::Blocked, &user);
    let suffered = edge(&pair(&aggressor, &user), RelationshipState::Blocked, &aggressor);

    let mut repo = MockRelationshipRepository::new();
    let edges = vec![placed, suffered];
    repo.expect_list_for_user()
        .times(1)
        .return_once(move |_, _| Ok(edges));

    let mut directory = MockUserDirectory::new();
    let expected_victim = victim.clone();
    directory
        .expect_find_by_ids()
        .times(1)
        .withf(move |ids| ids == [expected_victim.clone()])
        .returning(|ids| Ok(ids.iter().map(sample_user).collect()));

    let svc = service(repo, directory, FixtureNotificationQueue);
    let blocked = svc.list_blocked(&user).await.expect("list resolves");

    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked.first().map(|u| u.id().clone()), Some(victim));
}

#[tokio::test]
async fn friend_stats_pass_through_the_tally() {
    let user = UserId::random();
    let tally = RelationshipTally {
        friends: 3,
        pending_received: 1,
        pending_sent: 2,
        blocked: 1,
    };

    let mut repo = MockRelationshipRepository::new();
    repo.expect_count_for_user()
        .times(1)
        .return_once(move |_| Ok(tally));

    let svc = quiet_service(repo);
    let stats = svc.friend_stats(&user).await.expect("stats resolve");

    assert_eq!(stats, tally);
}

#[tokio::test]
async fn search_excludes_self_and_annotates_status() {
    let user = UserId::random();
    let friend = UserId::random();

    let mut directory = MockUserDirectory::new();
    let (self_id, friend_id) = (user.clone(), friend.clone());
    directory.expect_search().times(1).return_once(move |_, _| {
        Ok(vec![sample_user(&self_id), sample_user(&friend_id)])
    });

    let mut repo = MockRelationshipRepository::new();
    let stored = edge(&pair(&user, &friend), RelationshipState::Accepted, &user);
    repo.expect_find().times(1).return_once(move |_| Ok(Some(stored)));

    let svc = service(repo, directory, FixtureNotificationQueue);
    let matches = svc.search_users(&user, "sample").await.expect("search resolves");

    assert_eq!(matches.len(), 1);
    assert_eq!(
        matches.first().map(|m| m.status),
        Some(RelationshipStatus::Accepted)
    );
}

#[tokio::test]
async fn empty_search_terms_are_rejected() {
    let svc = quiet_service(MockRelationshipRepository::new());
    let error = svc
        .search_users(&UserId::random(), "   ")
        .await
        .expect_err("blank term fails");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

// --- error mapping and retry --------------------------------------------

#[tokio::test]
async fn connection_errors_are_retried_once_then_succeed() {
    let (a, b) = users();

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find()
        .times(1)
        .return_once(|_| Err(RelationshipRepositoryError::connection("pool exhausted")));
    repo.expect_find().times(1).return_once(|_| Ok(None));

    let svc = quiet_service(repo);
    let status = svc.status_between(&a, &b).await.expect("retry succeeds");

    assert_eq!(status, RelationshipStatus::None);
}

#[tokio::test]
async fn exhausted_connection_retries_surface_service_unavailable() {
    let (a, b) = users();

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find()
        .times(2)
        .returning(|_| Err(RelationshipRepositoryError::connection("pool exhausted")));

    let svc = quiet_service(repo);
    let error = svc
        .status_between(&a, &b)
        .await
        .expect_err("retries exhaust");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[tokio::test]
async fn query_errors_map_to_internal_without_retry() {
    let (a, b) = users();

    let mut repo = MockRelationshipRepository::new();
    repo.expect_find()
        .times(1)
        .return_once(|_| Err(RelationshipRepositoryError::query("bad column")));

    let svc = quiet_service(repo);
    let error = svc.status_between(&a, &b).await.expect_err("query error");

    assert_eq!(error.code(), ErrorCode::InternalError);
}
