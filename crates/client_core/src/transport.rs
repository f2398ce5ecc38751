//! HTTP access to the catalog API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use shared::{
    domain::{Credentials, Product, ProductDraft, ProductId, User},
    error::ApiError,
    protocol::{ProductCollection, LOGIN_PATH, LOGOUT_PATH, PRODUCTS_PATH, REGISTER_PATH},
};
use tracing::{debug, warn};
use url::Url;

use crate::{config::ClientSettings, error::ClientError};

/// Every request the coordination layer makes goes through this seam.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<User, ClientError>;
    async fn register(&self, credentials: &Credentials) -> Result<(), ClientError>;
    async fn logout(&self) -> Result<(), ClientError>;
    async fn list_products(&self) -> Result<Vec<Product>, ClientError>;
    async fn create_product(&self, draft: &ProductDraft) -> Result<(), ClientError>;
    async fn update_product(&self, product: &Product) -> Result<(), ClientError>;
    async fn delete_product(&self, id: &ProductId) -> Result<(), ClientError>;
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(&settings.base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    fn product_endpoint(&self, id: &ProductId) -> Result<Url, ClientError> {
        let mut url = self.endpoint(PRODUCTS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(id.as_str());
        Ok(url)
    }

    /// Sends once and returns the body of a 2xx response.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<String, ClientError> {
        let response = request.send().await.map_err(|err| {
            warn!(operation, "request did not reach the server: {err}");
            ClientError::Transport(err)
        })?;
        let status = response.status();
        let body = response.text().await?;
        debug!(operation, status = status.as_u16(), "catalog api responded");

        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::from_response(status.as_u16(), status.canonical_reason(), &body).into())
        }
    }
}

#[async_trait]
impl CatalogBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<User, ClientError> {
        let body = self
            .execute(
                "login",
                self.http.post(self.endpoint(LOGIN_PATH)?).json(credentials),
            )
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn register(&self, credentials: &Credentials) -> Result<(), ClientError> {
        self.execute(
            "register",
            self.http.post(self.endpoint(REGISTER_PATH)?).json(credentials),
        )
        .await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.execute("logout", self.http.post(self.endpoint(LOGOUT_PATH)?))
            .await?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, ClientError> {
        let body = self
            .execute("list_products", self.http.get(self.endpoint(PRODUCTS_PATH)?))
            .await?;
        Ok(ProductCollection::from_body(&body)?.items)
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<(), ClientError> {
        self.execute(
            "create_product",
            self.http.post(self.endpoint(PRODUCTS_PATH)?).json(draft),
        )
        .await?;
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<(), ClientError> {
        self.execute(
            "update_product",
            self.http.put(self.product_endpoint(&product.id)?).json(product),
        )
        .await?;
        Ok(())
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), ClientError> {
        self.execute("delete_product", self.http.delete(self.product_endpoint(id)?))
            .await?;
        Ok(())
    }
}

/// API paths are relative, so the base must end with `/` to keep any deployment prefix.
fn normalize_base_url(raw: &str) -> Result<Url, ClientError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&with_slash)?)
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
