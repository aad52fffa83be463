use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use serde::Serialize;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::auth::{Auth, AuthConfig, TokenTransport};
use crate::error::ApiError;
use crate::models::*;
use crate::password::Credentials;
use crate::repo::Repo;
use crate::services::{Accounts, Engagement, Feed, Notifications, SocialGraph};
use crate::storage::{AvatarStore, AvatarStoreError};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/auth/register").route(web::post().to(register)))
            .service(web::resource("/auth/login").route(web::post().to(login)))
            .service(web::resource("/auth/logout").route(web::post().to(logout)))
            .service(
                web::resource("/users/me")
                    .route(web::get().to(get_me))
                    .route(web::patch().to(update_me)),
            )
            .service(web::resource("/users/me/avatar").route(web::post().to(upload_avatar)))
            // literal segments before /users/{id}
            .service(web::resource("/users/random").route(web::get().to(random_users)))
            .service(web::resource("/users/search").route(web::get().to(search_users)))
            .service(web::resource("/users/{id}").route(web::get().to(get_user)))
            .service(web::resource("/posts").route(web::post().to(create_post)))
            .service(web::resource("/posts/me").route(web::get().to(my_posts)))
            .service(web::resource("/posts/feed").route(web::get().to(get_feed)))
            .service(
                web::resource("/follows")
                    .route(web::post().to(follow))
                    .route(web::delete().to(unfollow)),
            )
            .service(web::resource("/comments").route(web::post().to(create_comment)))
            .service(web::resource("/comments/{id}").route(web::delete().to(delete_comment)))
            .service(
                web::resource("/likes")
                    .route(web::post().to(create_like))
                    .route(web::delete().to(delete_like)),
            )
            .service(web::resource("/notifications").route(web::get().to(list_notifications)))
            .service(web::resource("/notifications/{id}/read").route(web::patch().to(mark_notification_read))),
    );
    // public fetch route, outside /api/v1 so avatar_url can be used directly as <img src>
    cfg.route("/avatars/{name}", web::get().to(get_avatar));
}

/// Services shared by every handler. The `Auth` extractor reads its
/// `AuthConfig` from a separate `web::Data<AuthConfig>`; see [`AppState::auth_data`].
#[derive(Clone)]
pub struct AppState {
    pub accounts: Accounts,
    pub graph: SocialGraph,
    pub engagement: Engagement,
    pub notifications: Notifications,
    pub feed: Feed,
    pub avatars: Arc<dyn AvatarStore>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, credentials: Credentials, auth: AuthConfig, avatars: Arc<dyn AvatarStore>) -> Self {
        let graph = SocialGraph::new(repo.clone());
        Self {
            accounts: Accounts::new(repo.clone(), graph.clone(), credentials, auth.clone()),
            graph,
            engagement: Engagement::new(repo.clone()),
            notifications: Notifications::new(repo.clone()),
            feed: Feed::new(repo),
            avatars,
            auth,
        }
    }

    pub fn auth_data(&self) -> web::Data<AuthConfig> {
        web::Data::new(self.auth.clone())
    }
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

// ---------------------------------------------------------------- auth

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = PublicUser),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Username or email already taken")
    ),
    tag = "auth"
)]
pub async fn register(data: web::Data<AppState>, payload: web::Json<RegisterRequest>) -> Result<HttpResponse, ApiError> {
    let user = data.accounts.register(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; token in cookie or body depending on AUTH_TRANSPORT"),
        (status = 401, description = "Invalid username or password")
    ),
    tag = "auth"
)]
pub async fn login(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let (_user, token) = data.accounts.login(payload.into_inner()).await?;
    match data.auth.transport {
        TokenTransport::Cookie => Ok(HttpResponse::Ok()
            .cookie(data.auth.session_cookie(token))
            .json(MessageResponse::new("Logged in successfully"))),
        TokenTransport::Bearer => Ok(HttpResponse::Ok().json(TokenResponse { token })),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Session cookie cleared", body = MessageResponse)),
    tag = "auth"
)]
pub async fn logout(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let mut resp = HttpResponse::Ok();
    if data.auth.transport == TokenTransport::Cookie {
        resp.cookie(data.auth.expired_cookie());
    }
    Ok(resp.json(MessageResponse::new("Logged out")))
}

// ---------------------------------------------------------------- users

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Caller's account", body = User),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "users"
)]
pub async fn get_me(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = data.accounts.me(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 400, description = "Nothing to update or invalid bio")
    ),
    tag = "users"
)]
pub async fn update_me(auth: Auth, data: web::Data<AppState>, payload: web::Json<UpdateProfile>) -> Result<HttpResponse, ApiError> {
    let user = data.accounts.update_me(auth.user_id(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

const AVATAR_SIZE_LIMIT: usize = 5 * 1024 * 1024;
const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[utoipa::path(
    post,
    path = "/api/v1/users/me/avatar",
    request_body(content = String, content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    responses(
        (status = 200, description = "Avatar stored and linked", body = User),
        (status = 400, description = "No file uploaded"),
        (status = 413, description = "Payload too large"),
        (status = 415, description = "Unsupported media type")
    ),
    tag = "users"
)]
pub async fn upload_avatar(auth: Auth, data: web::Data<AppState>, mut payload: Multipart) -> Result<HttpResponse, ApiError> {
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        tracing::warn!("multipart error: {e}");
        ApiError::Validation("Malformed multipart body".into())
    })? {
        if field.content_disposition().get_name() != Some("file") {
            continue;
        }
        let mut bytes: Vec<u8> = Vec::new();
        let mut hasher = Sha256::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            tracing::warn!("multipart stream error: {e}");
            ApiError::Validation("Malformed multipart body".into())
        })? {
            if bytes.len() + chunk.len() > AVATAR_SIZE_LIMIT {
                return Ok(HttpResponse::PayloadTooLarge().json(crate::error::ApiErrorBody {
                    error: "File too large".into(),
                }));
            }
            hasher.update(&chunk);
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            break;
        }
        let Some(kind) = infer::get(&bytes).filter(|t| ALLOWED_MIME.contains(&t.mime_type())) else {
            return Ok(HttpResponse::UnsupportedMediaType().json(crate::error::ApiErrorBody {
                error: "Only image files are allowed".into(),
            }));
        };
        let name = format!("{:x}.{}", hasher.finalize(), kind.extension());
        data.avatars.save(&name, &bytes).await.map_err(|e| {
            tracing::error!("avatar store save error: {e}");
            ApiError::Internal
        })?;
        let user = data.accounts.set_avatar(auth.user_id(), &format!("/avatars/{name}")).await?;
        return Ok(HttpResponse::Ok().json(user));
    }
    Err(ApiError::Validation("No file uploaded".into()))
}

#[utoipa::path(
    get,
    path = "/avatars/{name}",
    params(("name" = String, Path, description = "Stored avatar file name")),
    responses(
        (status = 200, description = "Avatar bytes"),
        (status = 404, description = "Not found")
    ),
    tag = "users"
)]
pub async fn get_avatar(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    match data.avatars.load(&path.into_inner()).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok().insert_header(("Content-Type", mime)).body(bytes)),
        Err(AvatarStoreError::NotFound) => Err(ApiError::NotFound),
        Err(e) => {
            tracing::error!("avatar store load error: {e}");
            Err(ApiError::Internal)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users/random",
    responses((status = 200, description = "Up to five random users", body = [PublicUser])),
    tag = "users"
)]
pub async fn random_users(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.accounts.random().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/search",
    params(SearchQuery),
    responses((status = 200, description = "Users whose name contains q", body = [PublicUser])),
    tag = "users"
)]
pub async fn search_users(_auth: Auth, data: web::Data<AppState>, query: web::Query<SearchQuery>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.accounts.search(&query.q).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "Public profile with follow counts", body = UserProfile),
        (status = 404, description = "Not found")
    ),
    tag = "users"
)]
pub async fn get_user(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let profile = data.accounts.profile(path.into_inner(), auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

// ---------------------------------------------------------------- posts

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Validation failed")
    ),
    tag = "posts"
)]
pub async fn create_post(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewPost>) -> Result<HttpResponse, ApiError> {
    let post = data.accounts.create_post(auth.user_id(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/me",
    responses((status = 200, description = "Caller's posts, newest first", body = [Post])),
    tag = "posts"
)]
pub async fn my_posts(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.feed.my_posts(auth.user_id()).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/feed",
    params(FeedQuery),
    responses((status = 200, description = "Posts from followed accounts", body = [FeedEntry])),
    tag = "posts"
)]
pub async fn get_feed(auth: Auth, data: web::Data<AppState>, query: web::Query<FeedQuery>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.feed.feed(auth.user_id(), query.limit).await?))
}

// ---------------------------------------------------------------- follows

#[utoipa::path(
    post,
    path = "/api/v1/follows",
    request_body = FollowRequest,
    responses(
        (status = 201, description = "Now following", body = MessageResponse),
        (status = 400, description = "Self-follow"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Already following")
    ),
    tag = "follows"
)]
pub async fn follow(auth: Auth, data: web::Data<AppState>, payload: web::Json<FollowRequest>) -> Result<HttpResponse, ApiError> {
    data.graph.follow(auth.user_id(), payload.following_id).await?;
    Ok(HttpResponse::Created().json(MessageResponse::new("User followed successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/v1/follows",
    request_body = FollowRequest,
    responses((status = 200, description = "No longer following", body = MessageResponse)),
    tag = "follows"
)]
pub async fn unfollow(auth: Auth, data: web::Data<AppState>, payload: web::Json<FollowRequest>) -> Result<HttpResponse, ApiError> {
    data.graph.unfollow(auth.user_id(), payload.following_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("User unfollowed successfully")))
}

// ---------------------------------------------------------------- comments

#[utoipa::path(
    post,
    path = "/api/v1/comments",
    request_body = NewComment,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Validation failed")
    ),
    tag = "comments"
)]
pub async fn create_comment(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewComment>) -> Result<HttpResponse, ApiError> {
    let comment = data.engagement.comment(payload.into_inner(), auth.user_id()).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Deleted comment", body = Comment),
        (status = 404, description = "No such comment owned by the caller")
    ),
    tag = "comments"
)]
pub async fn delete_comment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    match data.engagement.delete_comment(path.into_inner(), auth.user_id()).await? {
        Some(comment) => Ok(HttpResponse::Ok().json(comment)),
        None => Err(ApiError::NotFoundOrForbidden),
    }
}

// ---------------------------------------------------------------- likes

#[utoipa::path(
    post,
    path = "/api/v1/likes",
    request_body = LikeRequest,
    responses(
        (status = 201, description = "Like recorded", body = MessageResponse),
        (status = 200, description = "Already liked", body = MessageResponse)
    ),
    tag = "likes"
)]
pub async fn create_like(auth: Auth, data: web::Data<AppState>, payload: web::Json<LikeRequest>) -> Result<HttpResponse, ApiError> {
    if data.engagement.like(auth.user_id(), payload.into_inner().into()).await? {
        Ok(HttpResponse::Created().json(MessageResponse::new("Liked")))
    } else {
        Ok(HttpResponse::Ok().json(MessageResponse::new("Already liked")))
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/likes",
    request_body = LikeRequest,
    responses((status = 200, description = "Like removed (if present)", body = MessageResponse)),
    tag = "likes"
)]
pub async fn delete_like(auth: Auth, data: web::Data<AppState>, payload: web::Json<LikeRequest>) -> Result<HttpResponse, ApiError> {
    data.engagement.unlike(auth.user_id(), payload.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Unliked")))
}

// ---------------------------------------------------------------- notifications

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    responses((status = 200, description = "Caller's notifications, newest first", body = [Notification])),
    tag = "notifications"
)]
pub async fn list_notifications(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.notifications.list_for_user(auth.user_id()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Id, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read", body = Notification),
        (status = 404, description = "No such notification for the caller")
    ),
    tag = "notifications"
)]
pub async fn mark_notification_read(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    match data.notifications.mark_read(path.into_inner(), auth.user_id()).await? {
        Some(n) => Ok(HttpResponse::Ok().json(n)),
        None => Err(ApiError::NotFound),
    }
}
