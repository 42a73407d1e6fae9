use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{NewProduct, Product},
    repository::RepositoryState,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

/// create_product
///
/// [Guarded: admin, editor] Stores a new catalog product.
#[utoipa::path(
    post,
    path = "/products",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Created", body = Product),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn create_product(
    State(repo): State<RepositoryState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = repo.create_item(payload).await?;
    tracing::info!(product_id = %product.id, user_id = %user.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// get_product_by_name
///
/// [Guarded: admin, editor, viewer] Looks a product up by its exact name.
#[utoipa::path(
    get,
    path = "/products/{name}",
    params(("name" = String, Path, description = "Exact product name")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_product_by_name(
    State(repo): State<RepositoryState>,
    Path(name): Path<String>,
) -> Result<Json<Product>, ApiError> {
    repo.find_by_name(&name)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// get_me
///
/// [Guarded: any role] Returns the principal the guard attached to this request.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current principal", body = AuthUser),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}
