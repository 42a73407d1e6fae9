use crate::{
    AppState,
    auth::{AuthUser, roles},
    guard::AccessGuard,
    handlers, layer,
    registrar::{Guarded, Layer, RouteHandler, RouteTable},
};
use axum::routing::{get, post};

/// ProductRoutes
///
/// Catalog endpoints. Writes are limited to admins and editors; any known role may read.
pub struct ProductRoutes {
    guard: AccessGuard<AuthUser>,
}

impl ProductRoutes {
    pub fn new(guard: AccessGuard<AuthUser>) -> Self {
        Self { guard }
    }

    // POST /products
    fn create_action(&self, table: &mut RouteTable<AppState>) {
        table.guarded(
            "/products",
            self.restrict([roles::ADMIN, roles::EDITOR]),
            post(handlers::create_product),
        );
    }

    // GET /products/{name}
    fn find_by_name_action(&self, table: &mut RouteTable<AppState>) {
        table.guarded(
            "/products/{name}",
            self.restrict([roles::ADMIN, roles::EDITOR, roles::VIEWER]),
            get(handlers::get_product_by_name),
        );
    }
}

impl RouteHandler<AppState> for ProductRoutes {
    fn layers() -> Vec<Layer<Self, AppState>> {
        vec![layer!("ProductRoutes" => [create_action, find_by_name_action])]
    }
}

impl Guarded for ProductRoutes {
    type Principal = AuthUser;

    fn access_guard(&self) -> &AccessGuard<AuthUser> {
        &self.guard
    }
}
