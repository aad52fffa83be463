use std::sync::Arc;

use tracing::{debug, info};
use validator::Validate;

use crate::error::ApiError;
use crate::models::{Comment, Id, LikeTarget, NewComment};
use crate::repo::Repo;
use crate::services::fanout::{self, Event};

/// Likes and comments, with their notification side effects.
#[derive(Clone)]
pub struct Engagement {
    repo: Arc<dyn Repo>,
}

impl Engagement {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    /// Record a like. Liking twice is a no-op; the first like of someone
    /// else's post notifies its author.
    pub async fn like(&self, user_id: Id, target: LikeTarget) -> Result<bool, ApiError> {
        let owner = fanout::like_recipient(self.repo.as_ref(), target).await?;
        let notice = fanout::plan(Event::Liked { actor: user_id, owner });
        let created = self.repo.create_like(user_id, target, notice).await?;
        if created {
            info!(%user_id, target = ?target, "like created");
        } else {
            debug!(%user_id, target = ?target, "like already present");
        }
        Ok(created)
    }

    pub async fn unlike(&self, user_id: Id, target: LikeTarget) -> Result<(), ApiError> {
        self.repo.delete_like(user_id, target).await?;
        Ok(())
    }

    pub async fn comment(&self, new: NewComment, user_id: Id) -> Result<Comment, ApiError> {
        new.validate()?;
        if new.content.trim().is_empty() {
            return Err(ApiError::Validation("content must not be blank".into()));
        }
        let owner = fanout::comment_recipient(self.repo.as_ref(), new.target()).await?;
        let notice = fanout::plan(Event::Commented { actor: user_id, owner });
        let comment = self.repo.create_comment(user_id, new, notice).await?;
        info!(%user_id, comment_id = %comment.id, "comment created");
        Ok(comment)
    }

    /// Delete a comment the caller authored. `None` covers both "no such
    /// comment" and "not yours".
    pub async fn delete_comment(&self, comment_id: Id, user_id: Id) -> Result<Option<Comment>, ApiError> {
        Ok(self.repo.delete_comment(comment_id, user_id).await?)
    }
}
