use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub type Id = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    #[schema(skip)]
    pub password_hash: String, // PHC string, never leaves the server
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Subset of a user that other accounts are allowed to see.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PublicUser {
    pub id: Id,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self { id: u.id, username: u.username, bio: u.bio, avatar_url: u.avatar_url, created_at: u.created_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub followers: i64,
    pub following: i64,
    pub is_following: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateProfile {
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub author_id: Id,
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewPost {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    pub content: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

/// One row of a viewer's feed: the post, its author, and engagement aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct FeedEntry {
    pub id: Id,
    pub author_id: Id,
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    /// Page size, clamped to 1..=100 (default 20)
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Follow {
    pub follower_id: Id,
    pub following_id: Id,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FollowRequest {
    pub following_id: Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "like_target_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LikeTargetType {
    Post,
    Profile,
    Comment,
}

/// What a like points at. Targets are not foreign keys, so each variant is
/// resolved on its own terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeTarget {
    Post(Id),
    Profile(Id),
    Comment(Id),
}

impl LikeTarget {
    pub fn kind(&self) -> LikeTargetType {
        match self {
            LikeTarget::Post(_) => LikeTargetType::Post,
            LikeTarget::Profile(_) => LikeTargetType::Profile,
            LikeTarget::Comment(_) => LikeTargetType::Comment,
        }
    }

    pub fn id(&self) -> Id {
        match *self {
            LikeTarget::Post(id) | LikeTarget::Profile(id) | LikeTarget::Comment(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeRequest {
    pub target_type: LikeTargetType,
    pub target_id: Id,
}

impl From<LikeRequest> for LikeTarget {
    fn from(r: LikeRequest) -> Self {
        match r.target_type {
            LikeTargetType::Post => LikeTarget::Post(r.target_id),
            LikeTargetType::Profile => LikeTarget::Profile(r.target_id),
            LikeTargetType::Comment => LikeTarget::Comment(r.target_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Like {
    pub user_id: Id,
    pub target_type: LikeTargetType,
    pub target_id: Id,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "comment_target_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommentTargetType {
    Post,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentTarget {
    Post(Id),
    Profile(Id),
}

impl CommentTarget {
    pub fn kind(&self) -> CommentTargetType {
        match self {
            CommentTarget::Post(_) => CommentTargetType::Post,
            CommentTarget::Profile(_) => CommentTargetType::Profile,
        }
    }

    pub fn id(&self) -> Id {
        match *self {
            CommentTarget::Post(id) | CommentTarget::Profile(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewComment {
    pub target_type: CommentTargetType,
    pub target_id: Id,
    #[validate(length(min = 1))]
    pub content: String,
}

impl NewComment {
    pub fn target(&self) -> CommentTarget {
        match self.target_type {
            CommentTargetType::Post => CommentTarget::Post(self.target_id),
            CommentTargetType::Profile => CommentTarget::Profile(self.target_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub user_id: Id,
    pub target_type: CommentTargetType,
    pub target_id: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Like,
    Comment,
    Follow,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Notification {
    pub id: Id,
    pub to_user_id: Id,
    pub from_user_id: Id,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub to_user_id: Id,
    pub from_user_id: Id,
    pub kind: NotificationType,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
