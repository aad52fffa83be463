use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, new: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<User>;
    async fn update_bio(&self, id: Id, bio: Option<String>) -> RepoResult<User>;
    async fn update_avatar(&self, id: Id, avatar_url: &str) -> RepoResult<User>;
    async fn search_users(&self, query: &str, limit: i64) -> RepoResult<Vec<PublicUser>>;
    async fn random_users(&self, limit: i64) -> RepoResult<Vec<PublicUser>>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, author_id: Id, new: NewPost) -> RepoResult<Post>;
    /// Newest first.
    async fn list_posts_by_author(&self, author_id: Id) -> RepoResult<Vec<Post>>;
    async fn post_author(&self, post_id: Id) -> RepoResult<Option<Id>>;
}

/// Writes that may carry a notification persist both or neither.
#[async_trait]
pub trait FollowRepo: Send + Sync {
    async fn create_follow(&self, follower_id: Id, following_id: Id, notice: Option<NewNotification>) -> RepoResult<Follow>;
    async fn delete_follow(&self, follower_id: Id, following_id: Id) -> RepoResult<bool>;
    async fn is_following(&self, follower_id: Id, following_id: Id) -> RepoResult<bool>;
    /// (followers, following)
    async fn follow_counts(&self, user_id: Id) -> RepoResult<(i64, i64)>;
}

#[async_trait]
pub trait LikeRepo: Send + Sync {
    /// Returns false when the like already existed; the notice is dropped in that case.
    async fn create_like(&self, user_id: Id, target: LikeTarget, notice: Option<NewNotification>) -> RepoResult<bool>;
    async fn delete_like(&self, user_id: Id, target: LikeTarget) -> RepoResult<bool>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, user_id: Id, new: NewComment, notice: Option<NewNotification>) -> RepoResult<Comment>;
    /// Deletes only when `user_id` authored the comment.
    async fn delete_comment(&self, id: Id, user_id: Id) -> RepoResult<Option<Comment>>;
}

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn create_notification(&self, new: NewNotification) -> RepoResult<Notification>;
    /// Newest first.
    async fn list_notifications(&self, to_user_id: Id) -> RepoResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: Id, to_user_id: Id) -> RepoResult<Option<Notification>>;
}

#[async_trait]
pub trait FeedRepo: Send + Sync {
    async fn feed(&self, viewer_id: Id, limit: i64) -> RepoResult<Vec<FeedEntry>>;
}

pub trait Repo: UserRepo + PostRepo + FollowRepo + LikeRepo + CommentRepo + NotificationRepo + FeedRepo {}

impl<T> Repo for T where T: UserRepo + PostRepo + FollowRepo + LikeRepo + CommentRepo + NotificationRepo + FeedRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
    use uuid::Uuid;

    #[derive(Default)]
    struct State {
        users: HashMap<Id, User>,
        posts: Vec<Post>,
        follows: HashMap<(Id, Id), Follow>,
        likes: HashMap<(Id, LikeTargetType, Id), Like>,
        comments: Vec<Comment>,
        notifications: Vec<Notification>,
    }

    /// Process-local store. All statements of one operation run under a
    /// single write guard, which gives the same all-or-nothing behaviour as a
    /// Postgres transaction.
    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        fail_notifications: Arc<AtomicBool>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fault injection: make every notification write fail.
        #[doc(hidden)]
        pub fn fail_notification_writes(&self, fail: bool) {
            self.fail_notifications.store(fail, Ordering::SeqCst);
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn push_notification(&self, s: &mut State, new: NewNotification) -> RepoResult<Notification> {
            if self.fail_notifications.load(Ordering::SeqCst) {
                return Err(RepoError::Internal("notification write failed".into()));
            }
            let n = Notification {
                id: Uuid::new_v4(),
                to_user_id: new.to_user_id,
                from_user_id: new.from_user_id,
                kind: new.kind,
                message: new.message,
                read: false,
                created_at: Utc::now(),
            };
            s.notifications.push(n.clone());
            Ok(n)
        }

        /// `created_at DESC, id DESC`, the same order the Postgres queries use.
        fn newest_first(a: (DateTime<Utc>, Id), b: (DateTime<Utc>, Id)) -> std::cmp::Ordering {
            b.cmp(&a)
        }

        fn public_users(s: &State) -> Vec<PublicUser> {
            s.users.values().cloned().map(PublicUser::from).collect()
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.users.values().any(|u| u.username == new.username || u.email == new.email) {
                return Err(RepoError::Conflict);
            }
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                username: new.username,
                email: new.email,
                password_hash: new.password_hash,
                bio: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            };
            s.users.insert(user.id, user.clone());
            Ok(user)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            let s = self.read()?;
            s.users.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn find_user_by_username(&self, username: &str) -> RepoResult<User> {
            let s = self.read()?;
            s.users.values().find(|u| u.username == username).cloned().ok_or(RepoError::NotFound)
        }
        async fn update_bio(&self, id: Id, bio: Option<String>) -> RepoResult<User> {
            let mut s = self.write()?;
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            user.bio = bio;
            user.updated_at = Utc::now();
            Ok(user.clone())
        }
        async fn update_avatar(&self, id: Id, avatar_url: &str) -> RepoResult<User> {
            let mut s = self.write()?;
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            user.avatar_url = Some(avatar_url.to_string());
            user.updated_at = Utc::now();
            Ok(user.clone())
        }
        async fn search_users(&self, query: &str, limit: i64) -> RepoResult<Vec<PublicUser>> {
            let s = self.read()?;
            let needle = query.to_lowercase();
            let mut v: Vec<_> = Self::public_users(&s)
                .into_iter()
                .filter(|u| u.username.to_lowercase().contains(&needle))
                .collect();
            v.sort_by(|a, b| a.username.cmp(&b.username));
            v.truncate(limit.max(0) as usize);
            Ok(v)
        }
        async fn random_users(&self, limit: i64) -> RepoResult<Vec<PublicUser>> {
            use rand::seq::SliceRandom;
            let s = self.read()?;
            let mut v = Self::public_users(&s);
            v.shuffle(&mut rand::thread_rng());
            v.truncate(limit.max(0) as usize);
            Ok(v)
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn create_post(&self, author_id: Id, new: NewPost) -> RepoResult<Post> {
            let mut s = self.write()?;
            if !s.users.contains_key(&author_id) { return Err(RepoError::NotFound); }
            let now = Utc::now();
            let post = Post {
                id: Uuid::new_v4(),
                author_id,
                title: new.title,
                content: new.content,
                image_url: new.image_url,
                is_published: true,
                created_at: now,
                updated_at: now,
            };
            s.posts.push(post.clone());
            Ok(post)
        }
        async fn list_posts_by_author(&self, author_id: Id) -> RepoResult<Vec<Post>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.posts.iter()
                .filter(|p| p.author_id == author_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| Self::newest_first((a.created_at, a.id), (b.created_at, b.id)));
            Ok(v)
        }
        async fn post_author(&self, post_id: Id) -> RepoResult<Option<Id>> {
            let s = self.read()?;
            Ok(s.posts.iter().find(|p| p.id == post_id).map(|p| p.author_id))
        }
    }

    #[async_trait]
    impl FollowRepo for InMemRepo {
        async fn create_follow(&self, follower_id: Id, following_id: Id, notice: Option<NewNotification>) -> RepoResult<Follow> {
            let mut s = self.write()?;
            if !s.users.contains_key(&follower_id) || !s.users.contains_key(&following_id) {
                return Err(RepoError::NotFound);
            }
            let key = (follower_id, following_id);
            if s.follows.contains_key(&key) { return Err(RepoError::Conflict); }
            let follow = Follow { follower_id, following_id, created_at: Utc::now() };
            s.follows.insert(key, follow.clone());
            if let Some(n) = notice {
                if let Err(e) = self.push_notification(&mut s, n) {
                    s.follows.remove(&key);
                    return Err(e);
                }
            }
            Ok(follow)
        }
        async fn delete_follow(&self, follower_id: Id, following_id: Id) -> RepoResult<bool> {
            let mut s = self.write()?;
            Ok(s.follows.remove(&(follower_id, following_id)).is_some())
        }
        async fn is_following(&self, follower_id: Id, following_id: Id) -> RepoResult<bool> {
            let s = self.read()?;
            Ok(s.follows.contains_key(&(follower_id, following_id)))
        }
        async fn follow_counts(&self, user_id: Id) -> RepoResult<(i64, i64)> {
            let s = self.read()?;
            let followers = s.follows.keys().filter(|(_, to)| *to == user_id).count() as i64;
            let following = s.follows.keys().filter(|(from, _)| *from == user_id).count() as i64;
            Ok((followers, following))
        }
    }

    #[async_trait]
    impl LikeRepo for InMemRepo {
        async fn create_like(&self, user_id: Id, target: LikeTarget, notice: Option<NewNotification>) -> RepoResult<bool> {
            let mut s = self.write()?;
            if !s.users.contains_key(&user_id) { return Err(RepoError::NotFound); }
            let key = (user_id, target.kind(), target.id());
            if s.likes.contains_key(&key) { return Ok(false); }
            let like = Like { user_id, target_type: target.kind(), target_id: target.id(), created_at: Utc::now() };
            s.likes.insert(key, like);
            if let Some(n) = notice {
                if let Err(e) = self.push_notification(&mut s, n) {
                    s.likes.remove(&key);
                    return Err(e);
                }
            }
            Ok(true)
        }
        async fn delete_like(&self, user_id: Id, target: LikeTarget) -> RepoResult<bool> {
            let mut s = self.write()?;
            Ok(s.likes.remove(&(user_id, target.kind(), target.id())).is_some())
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn create_comment(&self, user_id: Id, new: NewComment, notice: Option<NewNotification>) -> RepoResult<Comment> {
            let mut s = self.write()?;
            if !s.users.contains_key(&user_id) { return Err(RepoError::NotFound); }
            let now = Utc::now();
            let comment = Comment {
                id: Uuid::new_v4(),
                user_id,
                target_type: new.target_type,
                target_id: new.target_id,
                content: new.content,
                created_at: now,
                updated_at: now,
            };
            s.comments.push(comment.clone());
            if let Some(n) = notice {
                if let Err(e) = self.push_notification(&mut s, n) {
                    s.comments.pop();
                    return Err(e);
                }
            }
            Ok(comment)
        }
        async fn delete_comment(&self, id: Id, user_id: Id) -> RepoResult<Option<Comment>> {
            let mut s = self.write()?;
            let pos = s.comments.iter().position(|c| c.id == id && c.user_id == user_id);
            Ok(pos.map(|i| s.comments.remove(i)))
        }
    }

    #[async_trait]
    impl NotificationRepo for InMemRepo {
        async fn create_notification(&self, new: NewNotification) -> RepoResult<Notification> {
            let mut s = self.write()?;
            self.push_notification(&mut s, new)
        }
        async fn list_notifications(&self, to_user_id: Id) -> RepoResult<Vec<Notification>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.notifications.iter()
                .filter(|n| n.to_user_id == to_user_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| Self::newest_first((a.created_at, a.id), (b.created_at, b.id)));
            Ok(v)
        }
        async fn mark_notification_read(&self, id: Id, to_user_id: Id) -> RepoResult<Option<Notification>> {
            let mut s = self.write()?;
            Ok(s.notifications
                .iter_mut()
                .find(|n| n.id == id && n.to_user_id == to_user_id)
                .map(|n| {
                    n.read = true;
                    n.clone()
                }))
        }
    }

    #[async_trait]
    impl FeedRepo for InMemRepo {
        async fn feed(&self, viewer_id: Id, limit: i64) -> RepoResult<Vec<FeedEntry>> {
            let s = self.read()?;
            let followed: HashSet<Id> = s.follows.keys()
                .filter(|(from, _)| *from == viewer_id)
                .map(|(_, to)| *to)
                .collect();
            let mut rows: Vec<FeedEntry> = s.posts.iter()
                .filter(|p| p.is_published && followed.contains(&p.author_id))
                .filter_map(|p| {
                    let author = s.users.get(&p.author_id)?;
                    let like_count = s.likes.keys()
                        .filter(|(_, kind, target)| *kind == LikeTargetType::Post && *target == p.id)
                        .count() as i64;
                    let comment_count = s.comments.iter()
                        .filter(|c| c.target_type == CommentTargetType::Post && c.target_id == p.id)
                        .count() as i64;
                    let is_liked = s.likes.contains_key(&(viewer_id, LikeTargetType::Post, p.id));
                    Some(FeedEntry {
                        id: p.id,
                        author_id: p.author_id,
                        title: p.title.clone(),
                        content: p.content.clone(),
                        image_url: p.image_url.clone(),
                        created_at: p.created_at,
                        author_username: author.username.clone(),
                        author_avatar_url: author.avatar_url.clone(),
                        like_count,
                        comment_count,
                        is_liked,
                    })
                })
                .collect();
            rows.sort_by(|a, b| Self::newest_first((a.created_at, a.id), (b.created_at, b.id)));
            rows.truncate(limit.max(0) as usize);
            Ok(rows)
        }
    }

}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{PgConnection, Pool, Postgres};
    use uuid::Uuid;

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }
    }

    const USER_COLS: &str = "id, username, email, password_hash, bio, avatar_url, created_at, updated_at";
    const PUBLIC_USER_COLS: &str = "id, username, bio, avatar_url, created_at";
    const POST_COLS: &str = "id, author_id, title, content, image_url, is_published, created_at, updated_at";
    const COMMENT_COLS: &str = "id, user_id, target_type, target_id, content, created_at, updated_at";
    const NOTIFICATION_COLS: &str = "id, to_user_id, from_user_id, type, message, read, created_at";

    /// Unique violations become `Conflict`, foreign-key violations `NotFound`.
    fn db_err(e: sqlx::Error) -> RepoError {
        if let sqlx::Error::RowNotFound = e {
            return RepoError::NotFound;
        }
        if let Some(code) = e.as_database_error().and_then(|d| d.code()) {
            match &*code {
                "23505" => return RepoError::Conflict,
                "23503" => return RepoError::NotFound,
                _ => {}
            }
        }
        RepoError::Internal(e.to_string())
    }

    fn like_pattern(query: &str) -> String {
        let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        format!("%{escaped}%")
    }

    async fn insert_notification(conn: &mut PgConnection, new: &NewNotification) -> RepoResult<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (id, to_user_id, from_user_id, type, message) VALUES ($1,$2,$3,$4,$5) RETURNING {NOTIFICATION_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.to_user_id)
        .bind(new.from_user_id)
        .bind(new.kind)
        .bind(&new.message)
        .fetch_one(&mut *conn).await.map_err(db_err)
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!(
                "INSERT INTO users (id, username, email, password_hash) VALUES ($1,$2,$3,$4) RETURNING {USER_COLS}"
            ))
            .bind(Uuid::new_v4()).bind(&new.username).bind(&new.email).bind(&new.password_hash)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn find_user_by_username(&self, username: &str) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE username = $1 LIMIT 1"))
                .bind(username)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn update_bio(&self, id: Id, bio: Option<String>) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!(
                "UPDATE users SET bio = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLS}"
            ))
            .bind(id).bind(bio)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn update_avatar(&self, id: Id, avatar_url: &str) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!(
                "UPDATE users SET avatar_url = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLS}"
            ))
            .bind(id).bind(avatar_url)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn search_users(&self, query: &str, limit: i64) -> RepoResult<Vec<PublicUser>> {
            sqlx::query_as::<_, PublicUser>(&format!(
                "SELECT {PUBLIC_USER_COLS} FROM users WHERE username ILIKE $1 ORDER BY username LIMIT $2"
            ))
            .bind(like_pattern(query)).bind(limit)
            .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn random_users(&self, limit: i64) -> RepoResult<Vec<PublicUser>> {
            sqlx::query_as::<_, PublicUser>(&format!(
                "SELECT {PUBLIC_USER_COLS} FROM users ORDER BY random() LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn create_post(&self, author_id: Id, new: NewPost) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!(
                "INSERT INTO posts (id, author_id, title, content, image_url) VALUES ($1,$2,$3,$4,$5) RETURNING {POST_COLS}"
            ))
            .bind(Uuid::new_v4()).bind(author_id).bind(&new.title).bind(&new.content).bind(&new.image_url)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn list_posts_by_author(&self, author_id: Id) -> RepoResult<Vec<Post>> {
            sqlx::query_as::<_, Post>(&format!(
                "SELECT {POST_COLS} FROM posts WHERE author_id = $1 ORDER BY created_at DESC, id DESC"
            ))
            .bind(author_id)
            .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn post_author(&self, post_id: Id) -> RepoResult<Option<Id>> {
            sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_optional(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl FollowRepo for PgRepo {
        async fn create_follow(&self, follower_id: Id, following_id: Id, notice: Option<NewNotification>) -> RepoResult<Follow> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let follow = sqlx::query_as::<_, Follow>(
                "INSERT INTO follows (follower_id, following_id) VALUES ($1,$2) \
                 ON CONFLICT DO NOTHING RETURNING follower_id, following_id, created_at"
            )
            .bind(follower_id).bind(following_id)
            .fetch_optional(&mut *tx).await.map_err(db_err)?
            .ok_or(RepoError::Conflict)?;
            if let Some(n) = notice.as_ref() {
                insert_notification(&mut tx, n).await?;
            }
            tx.commit().await.map_err(db_err)?;
            Ok(follow)
        }
        async fn delete_follow(&self, follower_id: Id, following_id: Id) -> RepoResult<bool> {
            let res = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id).bind(following_id)
                .execute(&self.pool).await.map_err(db_err)?;
            Ok(res.rows_affected() > 0)
        }
        async fn is_following(&self, follower_id: Id, following_id: Id) -> RepoResult<bool> {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)"
            )
            .bind(follower_id).bind(following_id)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn follow_counts(&self, user_id: Id) -> RepoResult<(i64, i64)> {
            sqlx::query_as::<_, (i64, i64)>(
                "SELECT (SELECT COUNT(*) FROM follows WHERE following_id = $1), \
                        (SELECT COUNT(*) FROM follows WHERE follower_id = $1)"
            )
            .bind(user_id)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl LikeRepo for PgRepo {
        async fn create_like(&self, user_id: Id, target: LikeTarget, notice: Option<NewNotification>) -> RepoResult<bool> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let inserted = sqlx::query(
                "INSERT INTO likes (user_id, target_type, target_id) VALUES ($1,$2,$3) ON CONFLICT DO NOTHING"
            )
            .bind(user_id).bind(target.kind()).bind(target.id())
            .execute(&mut *tx).await.map_err(db_err)?
            .rows_affected() > 0;
            if inserted {
                if let Some(n) = notice.as_ref() {
                    insert_notification(&mut tx, n).await?;
                }
            }
            tx.commit().await.map_err(db_err)?;
            Ok(inserted)
        }
        async fn delete_like(&self, user_id: Id, target: LikeTarget) -> RepoResult<bool> {
            let res = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND target_type = $2 AND target_id = $3")
                .bind(user_id).bind(target.kind()).bind(target.id())
                .execute(&self.pool).await.map_err(db_err)?;
            Ok(res.rows_affected() > 0)
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn create_comment(&self, user_id: Id, new: NewComment, notice: Option<NewNotification>) -> RepoResult<Comment> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let comment = sqlx::query_as::<_, Comment>(&format!(
                "INSERT INTO comments (id, user_id, target_type, target_id, content) VALUES ($1,$2,$3,$4,$5) RETURNING {COMMENT_COLS}"
            ))
            .bind(Uuid::new_v4()).bind(user_id).bind(new.target_type).bind(new.target_id).bind(&new.content)
            .fetch_one(&mut *tx).await.map_err(db_err)?;
            if let Some(n) = notice.as_ref() {
                insert_notification(&mut tx, n).await?;
            }
            tx.commit().await.map_err(db_err)?;
            Ok(comment)
        }
        async fn delete_comment(&self, id: Id, user_id: Id) -> RepoResult<Option<Comment>> {
            sqlx::query_as::<_, Comment>(&format!(
                "DELETE FROM comments WHERE id = $1 AND user_id = $2 RETURNING {COMMENT_COLS}"
            ))
            .bind(id).bind(user_id)
            .fetch_optional(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl NotificationRepo for PgRepo {
        async fn create_notification(&self, new: NewNotification) -> RepoResult<Notification> {
            let mut conn = self.pool.acquire().await.map_err(db_err)?;
            insert_notification(&mut conn, &new).await
        }
        async fn list_notifications(&self, to_user_id: Id) -> RepoResult<Vec<Notification>> {
            sqlx::query_as::<_, Notification>(&format!(
                "SELECT {NOTIFICATION_COLS} FROM notifications WHERE to_user_id = $1 ORDER BY created_at DESC, id DESC"
            ))
            .bind(to_user_id)
            .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn mark_notification_read(&self, id: Id, to_user_id: Id) -> RepoResult<Option<Notification>> {
            sqlx::query_as::<_, Notification>(&format!(
                "UPDATE notifications SET read = TRUE WHERE id = $1 AND to_user_id = $2 RETURNING {NOTIFICATION_COLS}"
            ))
            .bind(id).bind(to_user_id)
            .fetch_optional(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl FeedRepo for PgRepo {
        async fn feed(&self, viewer_id: Id, limit: i64) -> RepoResult<Vec<FeedEntry>> {
            sqlx::query_as::<_, FeedEntry>(r#"
                SELECT p.id, p.author_id, p.title, p.content, p.image_url, p.created_at,
                       u.username AS author_username, u.avatar_url AS author_avatar_url,
                       (SELECT COUNT(*) FROM likes l
                         WHERE l.target_type = 'post' AND l.target_id = p.id) AS like_count,
                       (SELECT COUNT(*) FROM comments c
                         WHERE c.target_type = 'post' AND c.target_id = p.id) AS comment_count,
                       EXISTS(SELECT 1 FROM likes l
                         WHERE l.target_type = 'post' AND l.target_id = p.id AND l.user_id = $1) AS is_liked
                FROM posts p
                INNER JOIN follows f ON f.following_id = p.author_id
                INNER JOIN users u ON u.id = p.author_id
                WHERE f.follower_id = $1 AND p.is_published
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT $2
            "#)
            .bind(viewer_id)
            .bind(limit)
            .fetch_all(&self.pool).await.map_err(db_err)
        }
    }
}
