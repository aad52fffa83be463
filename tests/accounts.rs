#![cfg(feature = "inmem-store")]

mod common;

use std::time::{Duration, Instant};

use agora::auth::{AuthConfig, TokenTransport};
use agora::error::ApiError;
use agora::models::{LoginRequest, RegisterRequest};
use agora::password::Credentials;
use agora::services::{Accounts, SocialGraph};

// Expensive enough that a skipped verify is obvious, cheap enough for CI.
fn measurable() -> Credentials {
    Credentials { memory_kib: 8 * 1024, time_cost: 2, parallelism: 1 }
}

fn accounts(shared: std::sync::Arc<dyn agora::repo::Repo>) -> Accounts {
    Accounts::new(
        shared.clone(),
        SocialGraph::new(shared),
        measurable(),
        AuthConfig::new("test-secret-must-be-32-bytes-long!!", TokenTransport::Bearer),
    )
}

fn login(name: &str, password: &str) -> LoginRequest {
    LoginRequest { username: name.into(), password: password.into() }
}

async fn fastest_rejection(svc: &Accounts, name: &str) -> Duration {
    let mut best = Duration::MAX;
    for _ in 0..5 {
        let started = Instant::now();
        let err = svc.login(login(name, "wrongpass1")).await.unwrap_err();
        best = best.min(started.elapsed());
        assert!(matches!(err, ApiError::InvalidCredentials));
    }
    best
}

#[actix_web::test]
async fn unknown_user_costs_as_much_as_wrong_password() {
    let (_r, shared) = common::repo();
    let svc = accounts(shared);
    svc.register(RegisterRequest {
        username: "alice".into(),
        email: "alice@example.com".into(),
        password: "password123".into(),
    })
    .await
    .unwrap();

    let known = fastest_rejection(&svc, "alice").await;
    let unknown = fastest_rejection(&svc, "nobody").await;
    assert!(
        unknown * 4 >= known,
        "unknown user rejected in {unknown:?}, wrong password in {known:?}"
    );
}

#[actix_web::test]
async fn login_succeeds_only_with_the_right_password() {
    let (_r, shared) = common::repo();
    let svc = accounts(shared);
    let created = svc
        .register(RegisterRequest {
            username: "bob".into(),
            email: "bob@example.com".into(),
            password: "password123".into(),
        })
        .await
        .unwrap();
    let (user, token) = svc.login(login("bob", "password123")).await.unwrap();
    assert_eq!(user.id, created.id);
    assert!(!token.is_empty());
    assert!(matches!(svc.login(login("bob", "password124")).await, Err(ApiError::InvalidCredentials)));
}

#[actix_web::test]
async fn profile_reports_follow_edges_from_the_graph() {
    let (r, shared) = common::repo();
    let (a, b) = (common::user(&r, "a").await, common::user(&r, "b").await);
    let svc = accounts(shared.clone());
    SocialGraph::new(shared).follow(a.id, b.id).await.unwrap();

    let seen_by_a = svc.profile(b.id, a.id).await.unwrap();
    assert_eq!((seen_by_a.followers, seen_by_a.following, seen_by_a.is_following), (1, 0, true));
    let seen_by_b = svc.profile(a.id, b.id).await.unwrap();
    assert_eq!((seen_by_b.followers, seen_by_b.following, seen_by_b.is_following), (0, 1, false));
}
