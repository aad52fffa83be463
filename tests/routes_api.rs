#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use actix_web::{cookie::Cookie, dev::ServiceResponse, test, web::Data, App};
use agora::{
    auth::{AuthConfig, TokenTransport},
    password::Credentials,
    repo::inmem::InMemRepo,
    routes::{config, AppState},
    storage::build_avatar_store,
};
use serde_json::{json, Value};

const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

// Hashing at production cost would dominate the suite.
fn cheap() -> Credentials {
    Credentials { memory_kib: 1024, time_cost: 1, parallelism: 1 }
}

fn state(transport: TokenTransport, avatar_dir: &std::path::Path) -> AppState {
    AppState::new(
        Arc::new(InMemRepo::new()),
        cheap(),
        AuthConfig::new(SECRET, transport),
        build_avatar_store(avatar_dir),
    )
}

macro_rules! app {
    ($state:expr) => {{
        let state: AppState = $state;
        test::init_service(
            App::new()
                .app_data(state.auth_data())
                .app_data(Data::new(state))
                .configure(config),
        )
        .await
    }};
}

async fn json_body(resp: ServiceResponse) -> Value {
    serde_json::from_slice(&test::read_body(resp).await).unwrap()
}

fn register_req(name: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"username": name, "email": format!("{name}@example.com"), "password": "password123"}))
}

fn login_req(name: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"username": name, "password": password}))
}

fn session_cookie(resp: &ServiceResponse) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|c| c.name() == AuthConfig::DEFAULT_COOKIE_NAME)
        .expect("session cookie")
        .into_owned()
}

#[actix_web::test]
async fn register_login_and_me_with_cookie() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(TokenTransport::Cookie, dir.path()));

    let resp = test::call_service(&app, register_req("alice").to_request()).await;
    assert_eq!(resp.status(), 201);
    let user = json_body(resp).await;
    assert_eq!(user["username"], "alice");
    assert!(user.get("password_hash").is_none());
    assert!(user.get("email").is_none());

    assert_eq!(test::call_service(&app, register_req("alice").to_request()).await.status(), 409);

    let resp = test::call_service(&app, login_req("alice", "wrong-password").to_request()).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(json_body(resp).await["error"], "Invalid username or password.");
    let resp = test::call_service(&app, login_req("nobody", "password123").to_request()).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(json_body(resp).await["error"], "Invalid username or password.");

    let resp = test::call_service(&app, login_req("alice", "password123").to_request()).await;
    assert_eq!(resp.status(), 200);
    let cookie = session_cookie(&resp);
    assert_eq!(cookie.http_only(), Some(true));

    let req = test::TestRequest::get().uri("/api/v1/users/me").cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let me = json_body(resp).await;
    assert_eq!(me["email"], "alice@example.com");
    assert!(me.get("password_hash").is_none());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/users/me").to_request()).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(json_body(resp).await["error"], "No token provided");

    let req = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .cookie(Cookie::new(AuthConfig::DEFAULT_COOKIE_NAME, "garbage"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(json_body(resp).await["error"], "Invalid token");

    let resp = test::call_service(&app, test::TestRequest::post().uri("/api/v1/auth/logout").to_request()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(session_cookie(&resp).value(), "");
}

#[actix_web::test]
async fn bearer_transport_returns_token_in_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(TokenTransport::Bearer, dir.path()));
    test::call_service(&app, register_req("bob").to_request()).await;

    let resp = test::call_service(&app, login_req("bob", "password123").to_request()).await;
    assert_eq!(resp.status(), 200);
    assert!(resp.response().cookies().next().is_none());
    let token = json_body(resp).await["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["username"], "bob");
}

#[actix_web::test]
async fn validation_errors_are_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(TokenTransport::Bearer, dir.path()));
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"username": "x", "email": "not-an-email", "password": "short"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(json_body(resp).await["error"], "invalid field(s): email, password, username");
}

/// Registers and logs in, yielding (user id, bearer header value).
macro_rules! signup {
    ($app:expr, $name:expr) => {{
        let user = json_body(test::call_service(&$app, register_req($name).to_request()).await).await;
        let resp = test::call_service(&$app, login_req($name, "password123").to_request()).await;
        let token = json_body(resp).await["token"].as_str().unwrap().to_string();
        (user["id"].as_str().unwrap().to_string(), format!("Bearer {token}"))
    }};
}

#[actix_web::test]
async fn social_flow_follow_post_like_comment_notify() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(TokenTransport::Bearer, dir.path()));
    let (alice_id, alice) = signup!(app, "alice");
    let (bob_id, bob) = signup!(app, "bob");

    // self-follow
    let req = test::TestRequest::post()
        .uri("/api/v1/follows")
        .insert_header(("Authorization", alice.clone()))
        .set_json(json!({"following_id": alice_id}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(json_body(resp).await["error"], "You cannot follow yourself");

    let follow = || {
        test::TestRequest::post()
            .uri("/api/v1/follows")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"following_id": bob_id}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, follow()).await.status(), 201);
    assert_eq!(test::call_service(&app, follow()).await.status(), 409);

    // bob posts
    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(("Authorization", bob.clone()))
        .set_json(json!({"title": "Hello", "content": "first post"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let post_id = json_body(resp).await["id"].as_str().unwrap().to_string();

    // alice likes twice; second is a no-op
    let like = || {
        test::TestRequest::post()
            .uri("/api/v1/likes")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"target_type": "post", "target_id": post_id}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, like()).await.status(), 201);
    assert_eq!(test::call_service(&app, like()).await.status(), 200);

    // alice comments
    let req = test::TestRequest::post()
        .uri("/api/v1/comments")
        .insert_header(("Authorization", alice.clone()))
        .set_json(json!({"target_type": "post", "target_id": post_id, "content": "nice"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let comment_id = json_body(resp).await["id"].as_str().unwrap().to_string();

    // feed
    let req = test::TestRequest::get()
        .uri("/api/v1/posts/feed?limit=10")
        .insert_header(("Authorization", alice.clone()))
        .to_request();
    let feed = json_body(test::call_service(&app, req).await).await;
    let rows = feed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["author_username"], "bob");
    assert_eq!(rows[0]["like_count"], 1);
    assert_eq!(rows[0]["comment_count"], 1);
    assert_eq!(rows[0]["is_liked"], true);

    // bob: follow, like, comment
    let req = test::TestRequest::get()
        .uri("/api/v1/notifications")
        .insert_header(("Authorization", bob.clone()))
        .to_request();
    let notes = json_body(test::call_service(&app, req).await).await;
    let notes = notes.as_array().unwrap();
    let mut kinds: Vec<_> = notes.iter().map(|n| n["type"].as_str().unwrap().to_string()).collect();
    kinds.sort();
    assert_eq!(kinds, ["comment", "follow", "like"]);
    let note_id = notes[0]["id"].as_str().unwrap().to_string();

    // only the recipient can mark it read
    let mark = |who: &str| {
        test::TestRequest::patch()
            .uri(&format!("/api/v1/notifications/{note_id}/read"))
            .insert_header(("Authorization", who.to_string()))
            .to_request()
    };
    assert_eq!(test::call_service(&app, mark(&alice)).await.status(), 404);
    let resp = test::call_service(&app, mark(&bob)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["read"], true);

    // bob cannot delete alice's comment; alice can
    let delete = |who: &str| {
        test::TestRequest::delete()
            .uri(&format!("/api/v1/comments/{comment_id}"))
            .insert_header(("Authorization", who.to_string()))
            .to_request()
    };
    assert_eq!(test::call_service(&app, delete(&bob)).await.status(), 404);
    let resp = test::call_service(&app, delete(&alice)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["content"], "nice");
    assert_eq!(test::call_service(&app, delete(&alice)).await.status(), 404);

    // profile view reflects the edge
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/users/{bob_id}"))
        .insert_header(("Authorization", alice.clone()))
        .to_request();
    let profile = json_body(test::call_service(&app, req).await).await;
    assert_eq!(profile["username"], "bob");
    assert_eq!(profile["followers"], 1);
    assert_eq!(profile["is_following"], true);

    // unfollow twice is fine
    for _ in 0..2 {
        let req = test::TestRequest::delete()
            .uri("/api/v1/follows")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"following_id": bob_id}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }
}

#[actix_web::test]
async fn profile_update_search_and_random() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(TokenTransport::Bearer, dir.path()));
    let (_, alice) = signup!(app, "alice");
    let _ = signup!(app, "malice");
    let _ = signup!(app, "bob");

    let req = test::TestRequest::patch()
        .uri("/api/v1/users/me")
        .insert_header(("Authorization", alice.clone()))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(json_body(resp).await["error"], "No data to update");

    let req = test::TestRequest::patch()
        .uri("/api/v1/users/me")
        .insert_header(("Authorization", alice.clone()))
        .set_json(json!({"bio": "hi there"}))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["bio"], "hi there");

    let req = test::TestRequest::get()
        .uri("/api/v1/users/search?q=ALI")
        .insert_header(("Authorization", alice.clone()))
        .to_request();
    let hits = json_body(test::call_service(&app, req).await).await;
    assert_eq!(hits.as_array().unwrap().len(), 2);

    // random needs no token
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/users/random").to_request()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 3);
}

fn multipart(field: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----agoraboundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"a.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[actix_web::test]
async fn avatar_upload_is_content_addressed_and_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = app!(state(TokenTransport::Bearer, dir.path()));
    let (_, alice) = signup!(app, "alice");

    let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R'];
    let (ct, body) = multipart("file", png);
    let req = test::TestRequest::post()
        .uri("/api/v1/users/me/avatar")
        .insert_header(("Authorization", alice.clone()))
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let url = json_body(resp).await["avatar_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/avatars/") && url.ends_with(".png"), "{url}");
    let stem = url.trim_start_matches("/avatars/").trim_end_matches(".png");
    assert_eq!(stem.len(), 64);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&url).to_request()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("Content-Type").unwrap(), "image/png");
    assert_eq!(test::read_body(resp).await.as_ref(), png);

    // not an image
    let (ct, body) = multipart("file", b"plain text, definitely not an image");
    let req = test::TestRequest::post()
        .uri("/api/v1/users/me/avatar")
        .insert_header(("Authorization", alice.clone()))
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 415);

    // wrong field name
    let (ct, body) = multipart("picture", png);
    let req = test::TestRequest::post()
        .uri("/api/v1/users/me/avatar")
        .insert_header(("Authorization", alice))
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(json_body(resp).await["error"], "No file uploaded");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/avatars/missing.png").to_request()).await;
    assert_eq!(resp.status(), 404);
}
