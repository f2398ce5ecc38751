use serde::{Deserialize, Serialize};

use crate::domain::Product;

pub const LOGIN_PATH: &str = "api/auth/login";
pub const REGISTER_PATH: &str = "api/auth/register";
pub const LOGOUT_PATH: &str = "api/auth/logout";
pub const PRODUCTS_PATH: &str = "api/v1/productos";

/// Body of `GET /api/v1/productos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCollection {
    pub items: Vec<Product>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CollectionShape {
    Wrapped(ProductCollection),
    Bare(Vec<Product>),
}

impl ProductCollection {
    /// Decodes either `{"items": [...]}` or a bare array.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        let shape: CollectionShape = serde_json::from_str(body)?;
        Ok(match shape {
            CollectionShape::Wrapped(collection) => collection,
            CollectionShape::Bare(items) => ProductCollection { items },
        })
    }
}
