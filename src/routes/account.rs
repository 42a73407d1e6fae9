use crate::{
    AppState,
    auth::{AuthUser, roles},
    guard::AccessGuard,
    handlers, layer,
    registrar::{Guarded, Layer, RouteHandler, RouteTable},
};
use axum::routing::get;

/// AccountRoutes
///
/// Endpoints describing the authenticated caller.
pub struct AccountRoutes {
    guard: AccessGuard<AuthUser>,
}

impl AccountRoutes {
    pub fn new(guard: AccessGuard<AuthUser>) -> Self {
        Self { guard }
    }

    // GET /me
    fn me_action(&self, table: &mut RouteTable<AppState>) {
        table.guarded(
            "/me",
            self.restrict([roles::ADMIN, roles::EDITOR, roles::VIEWER]),
            get(handlers::get_me),
        );
    }
}

impl RouteHandler<AppState> for AccountRoutes {
    fn layers() -> Vec<Layer<Self, AppState>> {
        vec![layer!("AccountRoutes" => [me_action])]
    }
}

impl Guarded for AccountRoutes {
    type Principal = AuthUser;

    fn access_guard(&self) -> &AccessGuard<AuthUser> {
        &self.guard
    }
}
