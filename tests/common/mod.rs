#![allow(dead_code)]

use std::sync::Arc;

use agora::models::{NewPost, NewUser, Post, User};
use agora::repo::inmem::InMemRepo;
use agora::repo::{PostRepo, Repo, UserRepo};

pub fn repo() -> (InMemRepo, Arc<dyn Repo>) {
    let r = InMemRepo::new();
    let shared: Arc<dyn Repo> = Arc::new(r.clone());
    (r, shared)
}

pub async fn user(r: &InMemRepo, name: &str) -> User {
    r.create_user(NewUser {
        username: name.into(),
        email: format!("{name}@example.com"),
        password_hash: "unused".into(),
    })
    .await
    .unwrap()
}

pub async fn post(r: &InMemRepo, author: &User, title: &str) -> Post {
    r.create_post(author.id, NewPost { title: title.into(), content: Some("body".into()), image_url: None })
        .await
        .unwrap()
}
