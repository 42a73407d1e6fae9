//! Concrete route handlers.
//!
//! Each handler declares its actions as `*_action` methods; the registrar in
//! `crate::registrar` discovers and mounts them. Handlers with protected routes
//! implement `Guarded` over the shared `AccessGuard` and gate routes through `restrict`.

/// GET /health and other unauthenticated endpoints.
pub mod public;

/// Product catalog endpoints.
pub mod products;

/// Endpoints about the calling principal.
pub mod account;

pub use account::AccountRoutes;
pub use products::ProductRoutes;
pub use public::PublicRoutes;
