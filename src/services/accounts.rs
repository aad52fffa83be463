use std::sync::Arc;

use actix_web::web;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{issue_token, AuthConfig};
use crate::error::ApiError;
use crate::models::*;
use crate::password::Credentials;
use crate::repo::{Repo, RepoError};
use crate::services::SocialGraph;

pub const SEARCH_LIMIT: i64 = 20;
pub const RANDOM_USERS: i64 = 5;

/// Registration, login, profiles and authoring.
#[derive(Clone)]
pub struct Accounts {
    repo: Arc<dyn Repo>,
    graph: SocialGraph,
    credentials: Credentials,
    auth: AuthConfig,
    // verified against when the username is unknown
    dummy_hash: Arc<str>,
}

impl Accounts {
    pub fn new(repo: Arc<dyn Repo>, graph: SocialGraph, credentials: Credentials, auth: AuthConfig) -> Self {
        let dummy_hash = credentials.dummy_hash().into();
        Self { repo, graph, credentials, auth, dummy_hash }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<PublicUser, ApiError> {
        req.validate()?;
        let credentials = self.credentials;
        let password = req.password;
        // Argon2 is the expensive part of the request; keep it off the async workers.
        let password_hash = web::block(move || credentials.hash(&password))
            .await
            .map_err(|e| {
                tracing::error!("hashing task failed: {e}");
                ApiError::Internal
            })??;
        let user = self.repo
            .create_user(NewUser { username: req.username, email: req.email, password_hash })
            .await?;
        info!(user_id = %user.id, username = %user.username, "account registered");
        Ok(user.into())
    }

    /// Check a username/password pair and issue a session token.
    /// Unknown users and wrong passwords fail identically, in content and in
    /// the Argon2 work spent.
    pub async fn login(&self, req: LoginRequest) -> Result<(User, String), ApiError> {
        req.validate().map_err(|_| ApiError::InvalidCredentials)?;
        let user = match self.repo.find_user_by_username(&req.username).await {
            Ok(u) => Some(u),
            Err(RepoError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let stored = match &user {
            Some(u) => u.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };
        let ok = self.verify_blocking(stored, req.password).await?;
        let user = match user {
            Some(u) if ok => u,
            _ => {
                warn!(username = %req.username, "login rejected");
                return Err(ApiError::InvalidCredentials);
            }
        };
        let token = issue_token(&self.auth, &user).map_err(|e| {
            tracing::error!("token signing failed: {e}");
            ApiError::Internal
        })?;
        info!(user_id = %user.id, "login succeeded");
        Ok((user, token))
    }

    async fn verify_blocking(&self, stored: String, password: String) -> Result<bool, ApiError> {
        let credentials = self.credentials;
        web::block(move || credentials.verify(&stored, &password))
            .await
            .map_err(|e| {
                tracing::error!("verification task failed: {e}");
                ApiError::Internal
            })
    }

    pub async fn me(&self, user_id: Id) -> Result<User, ApiError> {
        Ok(self.repo.get_user(user_id).await?)
    }

    pub async fn update_me(&self, user_id: Id, update: UpdateProfile) -> Result<User, ApiError> {
        update.validate()?;
        let Some(bio) = update.bio else {
            return Err(ApiError::Validation("No data to update".into()));
        };
        Ok(self.repo.update_bio(user_id, Some(bio)).await?)
    }

    pub async fn set_avatar(&self, user_id: Id, avatar_url: &str) -> Result<User, ApiError> {
        Ok(self.repo.update_avatar(user_id, avatar_url).await?)
    }

    pub async fn profile(&self, user_id: Id, viewer_id: Id) -> Result<UserProfile, ApiError> {
        let user = self.repo.get_user(user_id).await?;
        let (followers, following) = self.graph.counts(user_id).await?;
        let is_following = self.graph.is_following(viewer_id, user_id).await?;
        Ok(UserProfile { user: user.into(), followers, following, is_following })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<PublicUser>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repo.search_users(query, SEARCH_LIMIT).await?)
    }

    pub async fn random(&self) -> Result<Vec<PublicUser>, ApiError> {
        Ok(self.repo.random_users(RANDOM_USERS).await?)
    }

    pub async fn create_post(&self, author_id: Id, new: NewPost) -> Result<Post, ApiError> {
        new.validate()?;
        if new.title.trim().is_empty() {
            return Err(ApiError::Validation("title must not be blank".into()));
        }
        let post = self.repo.create_post(author_id, new).await?;
        info!(%author_id, post_id = %post.id, "post created");
        Ok(post)
    }
}
