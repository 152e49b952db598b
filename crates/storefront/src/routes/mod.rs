//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Readiness (database ping)
//! GET    /                       - Redirect to /products
//!
//! # Pages
//! GET    /products               - Product listing
//! GET    /cart                   - Cart page
//!
//! # Catalog API
//! GET    /api/products           - Listing (?category&featured&in_stock&q&limit)
//! GET    /api/products/{id}      - Product detail
//!
//! # Cart API
//! GET    /api/cart               - Cart and totals
//! POST   /api/cart/items         - Add {productId, quantity?, size?, color?}
//! PATCH  /api/cart/items/{id}    - Update {quantity}
//! DELETE /api/cart/items/{id}    - Remove line
//! DELETE /api/cart               - Clear
//!
//! # Checkout & orders (requires auth)
//! GET    /api/checkout/summary   - Pricing for the current cart
//! POST   /api/orders             - Submit order, clears the cart
//! GET    /api/orders             - Order history
//! GET    /api/orders/{id}        - One order
//!
//! # Auth (rate limited)
//! POST   /auth/register          - {email, password, name}
//! POST   /auth/login             - {email, password}
//! POST   /auth/logout
//! GET    /api/me                 - Current user
//!
//! # Admin
//! DELETE /api/admin/users/{id}   - Delete a user
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::{delete, get, patch, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::api_index))
        .route("/products/{id}", get(products::api_show))
        .route("/cart", get(cart::api_show).delete(cart::clear))
        .route("/cart/items", post(cart::add))
        .route(
            "/cart/items/{id}",
            patch(cart::update).delete(cart::remove),
        )
        .route("/checkout/summary", get(orders::summary))
        .route("/orders", get(orders::index).post(orders::create))
        .route("/orders/{id}", get(orders::show))
        .route("/me", get(auth::me))
        .route("/admin/users/{id}", delete(admin::delete_user))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/", get(|| async { Redirect::to("/products") }))
        .route("/products", get(products::index))
        .route("/cart", get(cart::show))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, header};
    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::cookie::{Cookie, CookieJar, Key};
    use tower_sessions::{MemoryStore, Session};

    use meridian_core::cart::ProductSnapshot;
    use meridian_core::{CartLineId, Email, ProductId, UserId, UserRole};

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::middleware::session::{SESSION_COOKIE_NAME, session_layer};
    use crate::models::{CurrentUser, session_keys};
    use crate::services::cart::load_cart;

    struct TestApp {
        router: Router,
        store: MemoryStore,
        config: StorefrontConfig,
    }

    impl TestApp {
        fn new() -> Self {
            let config = StorefrontConfig::for_tests("http://localhost:3000");
            // Never connected: these tests only exercise routes that skip the database.
            let pool = PgPoolOptions::new()
                .connect_lazy("postgres://localhost/meridian_test")
                .unwrap();
            let store = MemoryStore::default();
            let sessions = session_layer(store.clone(), &config).unwrap();
            let router = crate::app(AppState::new(config.clone(), pool), sessions);

            Self {
                router,
                store,
                config,
            }
        }

        /// A saved session, and the signed cookie that selects it.
        async fn session(&self, user: Option<&CurrentUser>) -> (Session, String) {
            let session = Session::new(None, Arc::new(self.store.clone()), None);
            if let Some(user) = user {
                session
                    .insert(session_keys::CURRENT_USER, user)
                    .await
                    .unwrap();
            }
            session.save().await.unwrap();
            let cookie = self.cookie_for(&session);
            (session, cookie)
        }

        fn cookie_for(&self, session: &Session) -> String {
            let key =
                Key::try_from(self.config.session_secret.expose_secret().as_bytes()).unwrap();
            let mut jar = CookieJar::new();
            jar.signed_mut(&key).add(Cookie::new(
                SESSION_COOKIE_NAME,
                session.id().unwrap().to_string(),
            ));
            let value = jar.get(SESSION_COOKIE_NAME).unwrap().value().to_string();
            format!("{SESSION_COOKIE_NAME}={value}")
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            cookie: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, axum::http::HeaderMap, Value) {
            let mut request = Request::builder()
                .method(method)
                .uri(uri)
                .header("x-forwarded-for", "203.0.113.10");
            if let Some(cookie) = cookie {
                request = request.header(header::COOKIE, cookie);
            }
            let request = match body {
                Some(body) => request
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => request.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, headers, json)
        }
    }

    fn user(id: &str, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse(&format!("{id}@meridian.test")).unwrap(),
            role,
        }
    }

    fn tee() -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new("p1"),
            name: "Tee".to_string(),
            price: Decimal::new(10, 0),
            images: vec!["/img/tee.jpg".to_string()],
        }
    }

    fn decimal(value: &Value) -> Decimal {
        Decimal::from_str(value.as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_root_redirect() {
        let app = TestApp::new();

        let (status, _, _) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, headers, _) = app.send(Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/products");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id_and_security_headers() {
        let app = TestApp::new();
        let (_, headers, _) = app.send(Method::GET, "/health", None, None).await;

        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert!(
            headers[header::CONTENT_SECURITY_POLICY]
                .to_str()
                .unwrap()
                .contains("default-src 'none'")
        );
    }

    #[tokio::test]
    async fn test_upstream_request_id_is_kept() {
        let app = TestApp::new();
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "edge-7f3a")
            .body(Body::empty())
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "edge-7f3a");
    }

    #[tokio::test]
    async fn test_empty_cart_for_new_visitor() {
        let app = TestApp::new();
        let (status, _, body) = app.send(Method::GET, "/api/cart", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lines"], json!([]));
        assert_eq!(body["totalItems"], 0);
        assert_eq!(decimal(&body["totalPrice"]), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_cart_update_remove_and_clear() {
        let app = TestApp::new();
        let (session, cookie) = app.session(None).await;

        let mut cart = load_cart(session.clone()).await;
        let line = cart.add_item(&tee(), 2, None, None).await;
        cart.add_item(&tee(), 3, Some("M".to_string()), Some("red".to_string()))
            .await;
        cart.add_item(&tee(), 1, None, None).await;
        session.save().await.unwrap();

        let (status, _, body) = app.send(Method::GET, "/api/cart", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lines"].as_array().unwrap().len(), 2);
        assert_eq!(body["totalItems"], 6);
        assert_eq!(decimal(&body["totalPrice"]), Decimal::new(60, 0));

        // Quantity floor
        let uri = format!("/api/cart/items/{line}");
        let (_, _, body) = app
            .send(Method::PATCH, &uri, Some(&cookie), Some(json!({ "quantity": 0 })))
            .await;
        assert_eq!(body["lines"][0]["quantity"], 1);
        assert_eq!(body["totalItems"], 4);

        // Unknown ids are no-ops
        let (status, _, body) = app
            .send(Method::DELETE, "/api/cart/items/missing", Some(&cookie), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalItems"], 4);

        let (_, _, body) = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
        assert_eq!(body["lines"].as_array().unwrap().len(), 1);
        assert_eq!(body["lines"][0]["size"], "M");

        let (_, _, body) = app.send(Method::DELETE, "/api/cart", Some(&cookie), None).await;
        assert_eq!(body["lines"], json!([]));

        let cart = load_cart(session).await;
        assert!(cart.state().is_empty());
        assert!(cart.state().line(&CartLineId::new(line.as_str())).is_none());
    }

    #[tokio::test]
    async fn test_checkout_requires_login() {
        let app = TestApp::new();

        for (method, uri) in [
            (Method::GET, "/api/checkout/summary"),
            (Method::GET, "/api/orders"),
            (Method::POST, "/api/orders"),
            (Method::GET, "/api/me"),
        ] {
            let (status, _, body) = app.send(method, uri, None, Some(json!({}))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error"], "Not authorized, please log in");
        }
    }

    #[tokio::test]
    async fn test_checkout_summary_prices_cart() {
        let app = TestApp::new();
        let (session, cookie) = app.session(Some(&user("u1", UserRole::Customer))).await;

        let mut cart = load_cart(session.clone()).await;
        cart.add_item(&tee(), 6, None, None).await;
        session.save().await.unwrap();

        let (status, _, body) = app
            .send(Method::GET, "/api/checkout/summary", Some(&cookie), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalItems"], 6);
        assert_eq!(decimal(&body["itemsPrice"]), Decimal::new(60, 0));
        assert_eq!(decimal(&body["shippingPrice"]), Decimal::new(10, 0));
        assert_eq!(decimal(&body["taxPrice"]), Decimal::new(9, 0));
        assert_eq!(decimal(&body["totalPrice"]), Decimal::new(79, 0));
    }

    #[tokio::test]
    async fn test_empty_order_is_rejected_before_saving() {
        let app = TestApp::new();
        let (_, cookie) = app.session(Some(&user("u1", UserRole::Customer))).await;

        let submission = json!({
            "items": [],
            "shippingAddress": {
                "fullName": "Ada Lovelace",
                "address": "1 Analytical Way",
                "city": "London",
                "postalCode": "N1",
                "country": "UK"
            },
            "paymentMethod": "card",
            "itemsPrice": "0",
            "shippingPrice": "0",
            "taxPrice": "0",
            "totalPrice": "0"
        });

        let (status, _, body) = app
            .send(Method::POST, "/api/orders", Some(&cookie), Some(submission))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "order has no items");
    }

    #[tokio::test]
    async fn test_order_priced_below_cart_is_rejected() {
        let app = TestApp::new();
        let (session, cookie) = app.session(Some(&user("u1", UserRole::Customer))).await;

        let mut cart = load_cart(session.clone()).await;
        let line = cart.add_item(&tee(), 5, None, None).await;
        session.save().await.unwrap();

        let submission = json!({
            "items": [{"productId": "p1", "name": "Tee", "quantity": 5, "price": "0"}],
            "shippingAddress": {
                "fullName": "Ada Lovelace",
                "address": "1 Analytical Way",
                "city": "London",
                "postalCode": "N1",
                "country": "UK"
            },
            "paymentMethod": "card",
            "itemsPrice": "0",
            "shippingPrice": "0",
            "taxPrice": "0",
            "totalPrice": "0"
        });

        let (status, _, body) = app
            .send(Method::POST, "/api/orders", Some(&cookie), Some(submission))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "order items do not match the cart");

        // Rejected orders leave the cart alone
        let cart = load_cart(session).await;
        assert_eq!(cart.state().line(&line).map(|l| l.quantity), Some(5));
    }

    #[tokio::test]
    async fn test_order_with_overflowing_price_is_rejected() {
        let app = TestApp::new();
        let (_, cookie) = app.session(Some(&user("u1", UserRole::Customer))).await;

        let submission = json!({
            "items": [{
                "productId": "p1",
                "name": "Tee",
                "quantity": 2,
                "price": "79228162514264337593543950335"
            }],
            "shippingAddress": {
                "fullName": "Ada Lovelace",
                "address": "1 Analytical Way",
                "city": "London",
                "postalCode": "N1",
                "country": "UK"
            },
            "paymentMethod": "card",
            "itemsPrice": "1",
            "shippingPrice": "0",
            "taxPrice": "0",
            "totalPrice": "1"
        });

        let (status, _, body) = app
            .send(Method::POST, "/api/orders", Some(&cookie), Some(submission))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "order amounts are out of range");
    }

    #[tokio::test]
    async fn test_admin_delete_user_authorization() {
        let app = TestApp::new();

        let (status, _, _) = app
            .send(Method::DELETE, "/api/admin/users/u2", None, None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, customer) = app.session(Some(&user("u1", UserRole::Customer))).await;
        let (status, _, body) = app
            .send(Method::DELETE, "/api/admin/users/u2", Some(&customer), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Not authorized as an admin");

        let (_, admin) = app.session(Some(&user("root", UserRole::Admin))).await;
        let (status, _, body) = app
            .send(Method::DELETE, "/api/admin/users/root", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot delete your own account");
    }

    #[tokio::test]
    async fn test_logout_keeps_cart() {
        let app = TestApp::new();
        let (session, cookie) = app.session(Some(&user("u1", UserRole::Customer))).await;

        let mut cart = load_cart(session.clone()).await;
        cart.add_item(&tee(), 2, None, None).await;
        session.save().await.unwrap();

        let (status, _, _) = app.send(Method::POST, "/auth/logout", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, _) = app.send(Method::GET, "/api/me", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, _, body) = app.send(Method::GET, "/api/cart", Some(&cookie), None).await;
        assert_eq!(body["totalItems"], 2);
    }
}
