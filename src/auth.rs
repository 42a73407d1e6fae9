use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, header, request::Parts};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    guard::{AccessGuard, AuthError, Authenticator},
    models::User,
    repository::RepositoryState,
};

/// Role identifiers understood by the catalog routes.
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const EDITOR: &str = "editor";
    pub const VIEWER: &str = "viewer";
}

const LOCAL_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload expected inside a bearer JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: id of the user to load.
    pub sub: Uuid,
    /// Expiration time; always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser
///
/// The principal resolved for an authenticated request. Guarded handlers read it
/// with `Extension<AuthUser>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS, ToSchema)]
#[ts(export)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// Role extractor for [`AuthUser`]: a user holds exactly its stored role.
pub fn user_roles(user: &AuthUser) -> Vec<String> {
    vec![user.role.clone()]
}

/// BearerAuthenticator
///
/// Resolves the caller from an `Authorization: Bearer <jwt>` header, then loads the
/// user to pick up its current role. Any token problem means "no principal"; only a
/// failing user lookup is an error.
///
/// In `Env::Local` an `x-user-id` header naming an existing user is accepted instead.
pub struct BearerAuthenticator {
    repo: RepositoryState,
    decoding_key: DecodingKey,
    validation: Validation,
    local_bypass: bool,
}

impl BearerAuthenticator {
    pub fn new(config: &AppConfig, repo: RepositoryState) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            repo,
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            local_bypass: config.env == Env::Local,
        }
    }

    async fn from_local_header(&self, headers: &HeaderMap) -> Result<Option<AuthUser>, AuthError> {
        let Some(user_id) = headers
            .get(LOCAL_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok())
        else {
            return Ok(None);
        };

        Ok(self.repo.get_user(user_id).await?.map(AuthUser::from))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl Authenticator<AuthUser> for BearerAuthenticator {
    async fn authenticate(&self, parts: &Parts) -> Result<Option<AuthUser>, AuthError> {
        if self.local_bypass {
            if let Some(user) = self.from_local_header(&parts.headers).await? {
                return Ok(Some(user));
            }
        }

        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(None);
        };

        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => {
                tracing::debug!(error = %err, "bearer token rejected");
                return Ok(None);
            }
        };

        // A valid token for a deleted user resolves to no principal.
        Ok(self.repo.get_user(claims.sub).await?.map(AuthUser::from))
    }
}

/// Builds the guard shared by every route handler: bearer authentication plus
/// [`user_roles`], bounded by the configured timeout.
pub fn access_guard(config: &AppConfig, repo: RepositoryState) -> AccessGuard<AuthUser> {
    AccessGuard::new(
        Arc::new(BearerAuthenticator::new(config, repo)),
        Arc::new(user_roles),
    )
    .with_timeout(config.auth_timeout)
}
