//! End-to-end tests for the Meridian storefront.
//!
//! These tests talk to a running server over HTTP and need a migrated,
//! seeded database:
//!
//! ```bash
//! cargo run -p meridian-cli -- migrate
//! cargo run -p meridian-cli -- seed --file demos/products.yaml
//! cargo run -p meridian-storefront &
//! cargo test -p meridian-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_BASE_URL` overrides the server address and
//! `STOREFRONT_TEST_PRODUCT` the product the cart tests add.

use reqwest::Client;
use serde_json::Value;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Product id seeded by `demos/products.yaml`.
#[must_use]
pub fn test_product_id() -> String {
    std::env::var("STOREFRONT_TEST_PRODUCT").unwrap_or_else(|_| "linen-shirt".to_string())
}

/// A client with its own cookie jar, i.e. one visitor.
///
/// Each request carries a unique forwarded address so parallel tests do not
/// share an auth rate limit bucket.
pub struct Visitor {
    client: Client,
    base_url: String,
    forwarded_for: String,
}

impl Visitor {
    /// Start a fresh visitor with an empty cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");
        let [a, b, ..] = uuid::Uuid::new_v4().into_bytes();

        Self {
            client,
            base_url: base_url(),
            forwarded_for: format!("10.42.{a}.{b}"),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("x-forwarded-for", &self.forwarded_for)
    }

    /// Send a request and return the status and JSON body (`Null` if empty).
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the body is not JSON.
    #[allow(clippy::expect_used)]
    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> (reqwest::StatusCode, Value) {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.expect("Request failed");
        let status = response.status();
        let text = response.text().await.expect("Failed to read body");
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).expect("Body is not JSON")
        };
        (status, json)
    }

    /// GET helper.
    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, Value) {
        self.send(reqwest::Method::GET, path, None).await
    }

    /// POST helper.
    pub async fn post(&self, path: &str, body: &Value) -> (reqwest::StatusCode, Value) {
        self.send(reqwest::Method::POST, path, Some(body)).await
    }

    /// Register a throwaway account and return its email.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201.
    pub async fn register(&self) -> String {
        let email = format!("e2e-{}@example.com", uuid::Uuid::new_v4());
        let (status, _) = self
            .post(
                "/auth/register",
                &serde_json::json!({
                    "email": email,
                    "password": "correct horse battery",
                    "name": "E2E Shopper",
                }),
            )
            .await;
        assert_eq!(status, reqwest::StatusCode::CREATED, "registration failed");
        email
    }
}

impl Default for Visitor {
    fn default() -> Self {
        Self::new()
    }
}
