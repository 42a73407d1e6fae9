use crate::{
    AppState, layer,
    registrar::{Layer, RouteHandler, RouteTable},
};
use axum::routing::get;

/// PublicRoutes
///
/// Endpoints reachable without a principal.
pub struct PublicRoutes;

impl PublicRoutes {
    // GET /health
    // Load balancer probe.
    fn health_action(&self, table: &mut RouteTable<AppState>) {
        table.route("/health", get(|| async { "ok" }));
    }
}

impl RouteHandler<AppState> for PublicRoutes {
    fn layers() -> Vec<Layer<Self, AppState>> {
        vec![layer!("PublicRoutes" => [health_action])]
    }
}
