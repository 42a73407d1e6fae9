use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Product
///
/// A catalog entry stored in the `products` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,

    // `type` is reserved in Rust; kept as "type" on the wire and in SQL.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub product_type: String,

    pub tags: Option<String>,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// NewProduct
///
/// Input payload for POST /products.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub tags: Option<String>,
}

/// User
///
/// Account record backing authentication. `role` is one of `admin`, `editor`, `viewer`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}
