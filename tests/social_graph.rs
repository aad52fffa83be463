#![cfg(feature = "inmem-store")]

mod common;

use agora::error::ApiError;
use agora::models::NotificationType;
use agora::repo::NotificationRepo;
use agora::services::fanout::FOLLOW_MESSAGE;
use agora::services::SocialGraph;

#[tokio::test]
async fn self_follow_is_invalid_operation() {
    let (r, shared) = common::repo();
    let a = common::user(&r, "a").await;
    let graph = SocialGraph::new(shared);
    let err = graph.follow(a.id, a.id).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidOperation("You cannot follow yourself")));
    assert!(!graph.is_following(a.id, a.id).await.unwrap());
    assert!(r.list_notifications(a.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn follow_notifies_followed_user_once() {
    let (r, shared) = common::repo();
    let (a, b) = (common::user(&r, "a").await, common::user(&r, "b").await);
    let graph = SocialGraph::new(shared);

    let edge = graph.follow(a.id, b.id).await.unwrap();
    assert_eq!((edge.follower_id, edge.following_id), (a.id, b.id));

    let notes = r.list_notifications(b.id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationType::Follow);
    assert_eq!(notes[0].from_user_id, a.id);
    assert_eq!(notes[0].message, FOLLOW_MESSAGE);
    assert!(r.list_notifications(a.id).await.unwrap().is_empty());

    // repeat follow conflicts and stays silent
    assert!(matches!(graph.follow(a.id, b.id).await, Err(ApiError::Conflict)));
    assert_eq!(r.list_notifications(b.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn follow_then_unfollow_leaves_no_edge() {
    let (r, shared) = common::repo();
    let (a, b) = (common::user(&r, "a").await, common::user(&r, "b").await);
    let graph = SocialGraph::new(shared);
    graph.follow(a.id, b.id).await.unwrap();
    assert_eq!(graph.counts(b.id).await.unwrap(), (1, 0));
    graph.unfollow(a.id, b.id).await.unwrap();
    assert!(!graph.is_following(a.id, b.id).await.unwrap());
    assert_eq!(graph.counts(b.id).await.unwrap(), (0, 0));
    // missing edge is not an error
    graph.unfollow(a.id, b.id).await.unwrap();
}

#[tokio::test]
async fn follow_rolls_back_when_notification_fails() {
    let (r, shared) = common::repo();
    let (a, b) = (common::user(&r, "a").await, common::user(&r, "b").await);
    let graph = SocialGraph::new(shared);
    r.fail_notification_writes(true);
    assert!(matches!(graph.follow(a.id, b.id).await, Err(ApiError::Internal)));
    assert!(!graph.is_following(a.id, b.id).await.unwrap());
    r.fail_notification_writes(false);
    graph.follow(a.id, b.id).await.unwrap();
}
