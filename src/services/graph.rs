use std::sync::Arc;

use tracing::info;

use crate::error::ApiError;
use crate::models::{Follow, Id};
use crate::repo::Repo;
use crate::services::fanout::{self, Event};

/// Follow graph maintenance.
#[derive(Clone)]
pub struct SocialGraph {
    repo: Arc<dyn Repo>,
}

impl SocialGraph {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    /// Create the edge `follower -> following` and notify `following`.
    ///
    /// Self-follows are rejected here; the store would accept them.
    /// A repeated follow is a `Conflict` and notifies nobody.
    pub async fn follow(&self, follower_id: Id, following_id: Id) -> Result<Follow, ApiError> {
        if follower_id == following_id {
            return Err(ApiError::InvalidOperation("You cannot follow yourself"));
        }
        let notice = fanout::plan(Event::Followed { actor: follower_id, followed: following_id });
        let edge = self.repo.create_follow(follower_id, following_id, notice).await?;
        info!(%follower_id, %following_id, "follow created");
        Ok(edge)
    }

    /// Remove the edge if present. Missing edges are not an error.
    pub async fn unfollow(&self, follower_id: Id, following_id: Id) -> Result<(), ApiError> {
        if self.repo.delete_follow(follower_id, following_id).await? {
            info!(%follower_id, %following_id, "follow removed");
        }
        Ok(())
    }

    pub async fn is_following(&self, follower_id: Id, following_id: Id) -> Result<bool, ApiError> {
        Ok(self.repo.is_following(follower_id, following_id).await?)
    }

    /// (followers, following)
    pub async fn counts(&self, user_id: Id) -> Result<(i64, i64), ApiError> {
        Ok(self.repo.follow_counts(user_id).await?)
    }
}
