use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{FeedEntry, Id, Post};
use crate::repo::Repo;

pub const DEFAULT_FEED_LIMIT: i64 = 20;
pub const MAX_FEED_LIMIT: i64 = 100;

/// Read-only post listings.
#[derive(Clone)]
pub struct Feed {
    repo: Arc<dyn Repo>,
}

impl Feed {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    pub async fn my_posts(&self, user_id: Id) -> Result<Vec<Post>, ApiError> {
        Ok(self.repo.list_posts_by_author(user_id).await?)
    }

    /// Newest posts from accounts `viewer_id` follows, with like/comment
    /// counts and whether the viewer liked each one.
    pub async fn feed(&self, viewer_id: Id, limit: Option<i64>) -> Result<Vec<FeedEntry>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);
        Ok(self.repo.feed(viewer_id, limit).await?)
    }
}
