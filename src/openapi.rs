use crate::models::{
    Comment, CommentTargetType, FeedEntry, FollowRequest, LikeRequest, LikeTargetType, LoginRequest,
    MessageResponse, NewComment, NewPost, Notification, NotificationType, Post, PublicUser, RegisterRequest,
    UpdateProfile, User, UserProfile,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::register,
        crate::routes::login,
        crate::routes::logout,
        crate::routes::get_me,
        crate::routes::update_me,
        crate::routes::upload_avatar,
        crate::routes::get_avatar,
        crate::routes::random_users,
        crate::routes::search_users,
        crate::routes::get_user,
        crate::routes::create_post,
        crate::routes::my_posts,
        crate::routes::get_feed,
        crate::routes::follow,
        crate::routes::unfollow,
        crate::routes::create_comment,
        crate::routes::delete_comment,
        crate::routes::create_like,
        crate::routes::delete_like,
        crate::routes::list_notifications,
        crate::routes::mark_notification_read,
    ),
    components(schemas(
        User, PublicUser, UserProfile, UpdateProfile, RegisterRequest, LoginRequest,
        Post, NewPost, FeedEntry, FollowRequest,
        LikeRequest, LikeTargetType, Comment, NewComment, CommentTargetType,
        Notification, NotificationType, MessageResponse, crate::routes::TokenResponse
    )),
    tags(
        (name = "auth", description = "Registration and sessions"),
        (name = "users", description = "Profiles, search and avatars"),
        (name = "posts", description = "Authoring and the follow feed"),
        (name = "follows", description = "Social graph edges"),
        (name = "comments", description = "Comments on posts and profiles"),
        (name = "likes", description = "Likes on posts, profiles and comments"),
        (name = "notifications", description = "Engagement notifications"),
    )
)]
pub struct ApiDoc;
