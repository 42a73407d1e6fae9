use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Route discovery and access control core.
pub mod guard;
pub mod registrar;

// Application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use guard::{AccessGuard, AuthError, Authenticator, GuardError, RoleGate};
pub use registrar::{Guarded, Layer, Member, RegistrationError, Registrar, RouteHandler, RouteTable};
pub use repository::{PostgresRepository, RepositoryState};

use routes::{AccountRoutes, ProductRoutes, PublicRoutes};

/// ApiDoc
///
/// OpenAPI document for the catalog endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::create_product, handlers::get_product_by_name, handlers::get_me),
    components(schemas(models::Product, models::NewProduct, auth::AuthUser)),
    tags((name = "catalog", description = "Product Catalog API"))
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Builds the shared access guard, mounts every route handler into one route table
/// and wraps the result in the observability layers.
///
/// Fails if any handler declares a route action that cannot be invoked.
pub fn create_router(state: AppState) -> Result<Router, RegistrationError> {
    let guard = auth::access_guard(&state.config, state.repo.clone());
    let registrar = Registrar::default();

    let mut table = RouteTable::<AppState>::new();
    registrar.register(PublicRoutes, &mut table)?;
    registrar.register(ProductRoutes::new(guard.clone()), &mut table)?;
    registrar.register(AccountRoutes::new(guard), &mut table)?;

    tracing::info!(routes = ?table.paths(), "route table assembled");

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(table.into_router())
        .with_state(state);

    Ok(base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors))
}

/// trace_span_logger
///
/// Span for each request, tagged with the `x-request-id` set by `SetRequestIdLayer`
/// so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
