//! Notification fan-out: deciding who hears about an engagement event, and
//! reading/acknowledging what was delivered.
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{CommentTarget, Id, LikeTarget, NewNotification, Notification, NotificationType};
use crate::repo::{Repo, RepoResult};

pub const LIKE_MESSAGE: &str = "Váš príspevok bol označený ako páči sa mi to.";
pub const COMMENT_MESSAGE: &str = "Váš príspevok bol komentovaný.";
pub const FOLLOW_MESSAGE: &str = "Začal vás sledovať nový používateľ.";

/// An engagement event with its recipient already resolved (`None` when the
/// target could not be resolved to an owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Followed { actor: Id, followed: Id },
    Liked { actor: Id, owner: Option<Id> },
    Commented { actor: Id, owner: Option<Id> },
}

/// Returns the notification an event should produce, if any.
/// Self-actions and unresolved owners produce nothing.
pub fn plan(event: Event) -> Option<NewNotification> {
    let (actor, recipient, kind, message) = match event {
        Event::Followed { actor, followed } => (actor, Some(followed), NotificationType::Follow, FOLLOW_MESSAGE),
        Event::Liked { actor, owner } => (actor, owner, NotificationType::Like, LIKE_MESSAGE),
        Event::Commented { actor, owner } => (actor, owner, NotificationType::Comment, COMMENT_MESSAGE),
    };
    let to_user_id = recipient.filter(|r| *r != actor)?;
    Some(NewNotification { to_user_id, from_user_id: actor, kind, message: message.to_string() })
}

/// Owner of a liked entity. Only posts resolve; profile and comment likes
/// notify nobody.
pub async fn like_recipient(repo: &dyn Repo, target: LikeTarget) -> RepoResult<Option<Id>> {
    match target {
        LikeTarget::Post(id) => repo.post_author(id).await,
        LikeTarget::Profile(_) | LikeTarget::Comment(_) => Ok(None),
    }
}

pub async fn comment_recipient(repo: &dyn Repo, target: CommentTarget) -> RepoResult<Option<Id>> {
    match target {
        CommentTarget::Post(id) => repo.post_author(id).await,
        CommentTarget::Profile(_) => Ok(None),
    }
}

#[derive(Clone)]
pub struct Notifications {
    repo: Arc<dyn Repo>,
}

impl Notifications {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    /// Persist a notification as-is. Callers own the self/missing-target checks.
    pub async fn create(&self, to_user_id: Id, from_user_id: Id, kind: NotificationType, message: &str) -> Result<Notification, ApiError> {
        let n = self.repo
            .create_notification(NewNotification { to_user_id, from_user_id, kind, message: message.to_string() })
            .await?;
        Ok(n)
    }

    pub async fn list_for_user(&self, user_id: Id) -> Result<Vec<Notification>, ApiError> {
        Ok(self.repo.list_notifications(user_id).await?)
    }

    /// `None` when no notification with this id is addressed to `recipient`.
    pub async fn mark_read(&self, id: Id, recipient: Id) -> Result<Option<Notification>, ApiError> {
        Ok(self.repo.mark_notification_read(id, recipient).await?)
    }
}
