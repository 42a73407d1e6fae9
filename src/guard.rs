use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{error::error_response, repository::RepositoryError};

/// Authenticator
///
/// Pluggable identity stage of the guard. Resolves to one of three outcomes:
/// an internal failure (`Err`), no principal (`Ok(None)`), or a principal (`Ok(Some(_))`).
#[async_trait]
pub trait Authenticator<P>: Send + Sync {
    async fn authenticate(&self, parts: &Parts) -> Result<Option<P>, AuthError>;
}

/// Maps an authenticated principal to its role identifiers.
pub type RoleExtractor<P> = Arc<dyn Fn(&P) -> Vec<String> + Send + Sync>;

/// Internal failure of an authentication strategy. Always fatal to the request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("principal lookup failed: {0}")]
    Lookup(#[from] RepositoryError),
    #[error("authentication did not complete within {0:?}")]
    TimedOut(Duration),
    #[error("authentication strategy failed: {0}")]
    Strategy(String),
}

/// GuardError
///
/// Every way a guarded request can be stopped before reaching its handler.
/// `Unauthorized` and `Forbidden` are expected outcomes; `Authentication` is an internal error.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("no authenticated principal")]
    Unauthorized,
    #[error("principal holds none of the permitted roles")]
    Forbidden,
    #[error(transparent)]
    Authentication(#[from] AuthError),
}

impl GuardError {
    pub fn status(&self) -> StatusCode {
        match self {
            GuardError::Unauthorized => StatusCode::UNAUTHORIZED,
            GuardError::Forbidden => StatusCode::FORBIDDEN,
            GuardError::Authentication(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GuardError::Unauthorized => "unauthorized",
            GuardError::Forbidden => "forbidden",
            GuardError::Authentication(_) => "internal_error",
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        if let GuardError::Authentication(err) = &self {
            tracing::error!(error = %err, "authentication strategy failed");
        }
        error_response(self.status(), self.code())
    }
}

/// AccessGuard
///
/// Holds the two configured stages (authenticator and role extractor) and hands out
/// per-route [`RoleGate`]s. Cloning is cheap and shares the same configuration.
pub struct AccessGuard<P> {
    authenticator: Arc<dyn Authenticator<P>>,
    role_extractor: RoleExtractor<P>,
    timeout: Option<Duration>,
}

impl<P> Clone for AccessGuard<P> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            role_extractor: self.role_extractor.clone(),
            timeout: self.timeout,
        }
    }
}

impl<P> AccessGuard<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new(authenticator: Arc<dyn Authenticator<P>>, role_extractor: RoleExtractor<P>) -> Self {
        Self {
            authenticator,
            role_extractor,
            timeout: None,
        }
    }

    /// Bounds how long a single authentication attempt may take. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// guard
    ///
    /// Produces a gate admitting authenticated callers holding at least one of `permitted`.
    /// Each gate owns its own role set.
    pub fn guard<I, R>(&self, permitted: I) -> RoleGate<P>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        RoleGate {
            guard: self.clone(),
            permitted: Arc::new(permitted.into_iter().map(Into::into).collect()),
        }
    }

    async fn authenticate(&self, parts: &Parts) -> Result<Option<P>, AuthError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.authenticator.authenticate(parts))
                .await
                .map_err(|_| AuthError::TimedOut(limit))?,
            None => self.authenticator.authenticate(parts).await,
        }
    }
}

/// RoleGate
///
/// The per-route check produced by [`AccessGuard::guard`].
pub struct RoleGate<P> {
    guard: AccessGuard<P>,
    permitted: Arc<HashSet<String>>,
}

impl<P> Clone for RoleGate<P> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            permitted: self.permitted.clone(),
        }
    }
}

impl<P> RoleGate<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn permitted(&self) -> impl Iterator<Item = &str> {
        self.permitted.iter().map(String::as_str)
    }

    /// True when at least one of `roles` is in the permitted set.
    pub fn permits(&self, roles: &[String]) -> bool {
        roles.iter().any(|role| self.permitted.contains(role))
    }

    /// check
    ///
    /// Authenticates the caller, attaches the principal to the request extensions,
    /// then authorizes it against the permitted set. Authorization never runs unless
    /// authentication produced a principal.
    pub async fn check(&self, parts: &mut Parts) -> Result<P, GuardError> {
        let principal = self
            .guard
            .authenticate(parts)
            .await?
            .ok_or(GuardError::Unauthorized)?;

        parts.extensions.insert(principal.clone());

        let roles = (self.guard.role_extractor)(&principal);
        if !self.permits(&roles) {
            tracing::debug!(?roles, permitted = ?self.permitted, "request forbidden");
            return Err(GuardError::Forbidden);
        }

        Ok(principal)
    }
}

/// enforce
///
/// Route middleware running a [`RoleGate`] ahead of the terminal handler.
/// Installed through [`crate::registrar::RouteTable::guarded`].
pub async fn enforce<P>(State(gate): State<RoleGate<P>>, request: Request, next: Next) -> Response
where
    P: Clone + Send + Sync + 'static,
{
    let (mut parts, body) = request.into_parts();

    match gate.check(&mut parts).await {
        Ok(_) => next.run(Request::from_parts(parts, body)).await,
        Err(err) => err.into_response(),
    }
}
