use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::models::{Id, User};

/// Where the session token travels. Exactly one is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTransport {
    Cookie,
    Bearer,
}

impl std::str::FromStr for TokenTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "bearer" | "header" => Ok(Self::Bearer),
            other => Err(format!("unknown token transport '{other}' (expected cookie|bearer)")),
        }
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    pub ttl_secs: i64,
    pub transport: TokenTransport,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("ttl_secs", &self.ttl_secs)
            .field("transport", &self.transport)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    pub const DEFAULT_TTL_SECS: i64 = 10_000;
    /// One year.
    pub const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;
    pub const DEFAULT_COOKIE_NAME: &'static str = "authToken";

    pub fn new(secret: impl Into<String>, transport: TokenTransport) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs: Self::DEFAULT_TTL_SECS,
            transport,
            cookie_name: Self::DEFAULT_COOKIE_NAME.to_string(),
            cookie_secure: false,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, secure: bool) -> Self {
        self.cookie_name = name.into();
        self.cookie_secure = secure;
        self
    }

    /// Cookie carrying a freshly issued token; lives as long as the token.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(self.cookie_name.clone(), token)
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(self.ttl_secs))
            .finish()
    }

    pub fn expired_cookie(&self) -> Cookie<'static> {
        let mut c = self.session_cookie(String::new());
        c.make_removal();
        c
    }
}

/// Token payload. Deliberately minimal: no email, no credential hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Id,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn for_user(user: &User, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user.id,
            username: user.username.clone(),
            iat: now as usize,
            exp: now.saturating_add(ttl_secs.max(0)) as usize,
        }
    }
}

pub fn encode_claims(cfg: &AuthConfig, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
}

/// Issue a session token for `user`, valid for `cfg.ttl_secs`.
pub fn issue_token(cfg: &AuthConfig, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    encode_claims(cfg, &Claims::for_user(user, cfg.ttl_secs))
}

/// Validate signature and expiry (no leeway) and return the claims.
pub fn verify_token(cfg: &AuthConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Extractor yielding the authenticated caller's claims.
pub struct Auth(pub Claims);

impl Auth {
    pub fn user_id(&self) -> Id {
        self.0.sub
    }
}

fn extract_token(req: &HttpRequest, pl: &mut Payload, cfg: &AuthConfig) -> Option<String> {
    match cfg.transport {
        TokenTransport::Cookie => req
            .cookie(&cfg.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty()),
        TokenTransport::Bearer => BearerAuth::from_request(req, pl)
            .into_inner()
            .ok()
            .map(|b| b.token().to_string()),
    }
}

impl FromRequest for Auth {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Some(cfg) = req.app_data::<web::Data<AuthConfig>>() else {
            tracing::error!("AuthConfig missing from app data");
            return ready(Err(ApiError::Internal));
        };
        let Some(token) = extract_token(req, pl, cfg) else {
            return ready(Err(ApiError::Unauthorized("No token provided")));
        };
        match verify_token(cfg, &token) {
            Ok(claims) => ready(Ok(Auth(claims))),
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                ready(Err(ApiError::Unauthorized("Invalid token")))
            }
        }
    }
}
