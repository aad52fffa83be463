#![cfg(feature = "inmem-store")]

mod common;

use agora::models::NotificationType;
use agora::services::Notifications;

#[tokio::test]
async fn custom_notification_listed_newest_first_and_marked_read() {
    let (r, shared) = common::repo();
    let (a, b) = (common::user(&r, "a").await, common::user(&r, "b").await);
    let svc = Notifications::new(shared);

    let first = svc.create(b.id, a.id, NotificationType::Custom, "first").await.unwrap();
    let second = svc.create(b.id, a.id, NotificationType::Custom, "second").await.unwrap();
    assert!(!first.read);

    let listed: Vec<_> = svc.list_for_user(b.id).await.unwrap().into_iter().map(|n| n.id).collect();
    assert_eq!(listed, [second.id, first.id]);
    assert!(svc.list_for_user(a.id).await.unwrap().is_empty());

    assert!(svc.mark_read(first.id, a.id).await.unwrap().is_none());
    assert!(svc.mark_read(first.id, b.id).await.unwrap().unwrap().read);
    // marking twice is harmless
    assert!(svc.mark_read(first.id, b.id).await.unwrap().unwrap().read);
}
