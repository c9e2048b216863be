//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::AuthService;
use crate::interfaces::http::middleware::auth_middleware;
use crate::interfaces::http::modules::metrics::{
    http_metrics_middleware, prometheus_metrics, MetricsState,
};
use crate::interfaces::http::modules::request_id::request_id_middleware;
use crate::interfaces::http::modules::{auth, health};

/// Everything the routes need
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth,
            started_at: Arc::new(Instant::now()),
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::profile,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::LoginResponse,
        auth::UserInfo,
        health::HealthResponse,
        health::ComponentHealth,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and profile"),
        (name = "Health", description = "Liveness probe")
    ),
    info(
        title = "Identity Service API",
        version = "1.0.0",
        description = "Account registration, login and bearer-token identity",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

pub fn create_api_router(state: AppState, prometheus: PrometheusHandle) -> Router {
    let public_auth = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .with_state(state.auth.clone());

    let protected_auth = Router::new()
        .route("/profile", get(auth::profile))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state.auth.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            directory: state.auth.directory().clone(),
            started_at: state.started_at.clone(),
        });

    let metrics_routes = Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(MetricsState { handle: prometheus });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1/auth", public_auth.merge(protected_auth))
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tower::Service;

    use super::*;
    use crate::domain::{
        DomainError, DomainResult, NewUser, User, UserDirectory, UserLookup,
    };
    use crate::infrastructure::crypto::jwt::test_config;
    use crate::infrastructure::crypto::password::fast_hasher;
    use crate::infrastructure::crypto::{JwtConfig, JwtIssuer};
    use crate::infrastructure::storage::InMemoryUserDirectory;

    fn service(directory: Arc<dyn UserDirectory>) -> AuthService {
        AuthService::new(
            directory,
            Arc::new(fast_hasher()),
            Arc::new(JwtIssuer::new(test_config())),
        )
    }

    fn app_with(directory: Arc<dyn UserDirectory>) -> Router {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        create_api_router(AppState::new(service(directory)), handle)
    }

    fn app() -> Router {
        app_with(Arc::new(InMemoryUserDirectory::new()))
    }

    async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
        app.clone().into_service().call(req).await.unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str, password: &str) -> Response<Body> {
        send(
            app,
            post_json(
                "/api/v1/auth/register",
                json!({"email": email, "password": password, "repassword": password}),
            ),
        )
        .await
    }

    async fn login(app: &Router, email: &str, password: &str) -> Response<Body> {
        send(
            app,
            post_json(
                "/api/v1/auth/login",
                json!({"email": email, "password": password}),
            ),
        )
        .await
    }

    #[tokio::test]
    async fn register_login_profile_round_trip() {
        let app = app();

        let resp = register(&app, "a@b.com", "secret1").await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["success"], true);
        assert_eq!(created["data"]["name"], "a");
        assert_eq!(created["data"]["email"], "a@b.com");
        assert!(created["data"].get("password_hash").is_none());
        let id = created["data"]["id"].as_i64().unwrap();
        assert!(id > 0);

        let resp = login(&app, "a@b.com", "secret1").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let session = body_json(resp).await;
        assert_eq!(session["data"]["token_type"], "Bearer");
        assert_eq!(session["data"]["expires_in"], 24 * 3600);
        assert_eq!(session["data"]["user"]["id"], id);
        let token = session["data"]["token"].as_str().unwrap().to_string();

        let resp = send(&app, get_with_token("/api/v1/auth/profile", Some(&token))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let profile = body_json(resp).await;
        assert_eq!(profile["data"]["id"], id);
        assert_eq!(profile["data"]["email"], "a@b.com");
    }

    #[tokio::test]
    async fn duplicate_registration_is_409() {
        let app = app();
        register(&app, "a@b.com", "secret1").await;

        let resp = register(&app, "a@b.com", "secret2").await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["code"], "EMAIL_EXISTS");
    }

    #[tokio::test]
    async fn login_failures_are_distinguishable() {
        let app = app();
        register(&app, "a@b.com", "secret1").await;

        let resp = login(&app, "a@b.com", "wrong-password").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["code"], "WRONG_PASSWORD");

        let resp = login(&app, "ghost@b.com", "secret1").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["code"], "EMAIL_NOT_FOUND");
    }

    #[tokio::test]
    async fn register_body_is_validated() {
        let app = app();

        let mismatch = post_json(
            "/api/v1/auth/register",
            json!({"email": "a@b.com", "password": "secret1", "repassword": "secret2"}),
        );
        let resp = send(&app, mismatch).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(resp).await["code"], "VALIDATION_FAILED");

        let resp = register(&app, "not-an-email", "secret1").await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = register(&app, "a@b.com", "12345").await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let missing = post_json("/api/v1/auth/register", json!({"email": "a@b.com"}));
        let resp = send(&app, missing).await;
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn profile_token_failures_have_distinct_codes() {
        let app = app();

        let resp = send(&app, get_with_token("/api/v1/auth/profile", None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["code"], "MISSING_TOKEN");

        let resp = send(&app, get_with_token("/api/v1/auth/profile", Some("garbage"))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["code"], "INVALID_TOKEN");

        let expired = JwtIssuer::new(JwtConfig {
            expiration_hours: -2,
            ..test_config()
        })
        .issue(1, "a")
        .unwrap();
        let resp = send(
            &app,
            get_with_token("/api/v1/auth/profile", Some(&expired.token)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn valid_token_for_unknown_user_is_invalid_user() {
        let app = app();
        let token = JwtIssuer::new(test_config()).issue(404, "ghost").unwrap();

        let resp = send(
            &app,
            get_with_token("/api/v1/auth/profile", Some(&token.token)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["code"], "INVALID_USER");
    }

    struct UnavailableDirectory;

    #[async_trait]
    impl UserDirectory for UnavailableDirectory {
        async fn find_user(&self, _lookup: UserLookup<'_>) -> DomainResult<Option<User>> {
            Err(DomainError::Persistence("connection refused".into()))
        }

        async fn create_user(&self, _new_user: NewUser) -> DomainResult<User> {
            Err(DomainError::Persistence("connection refused".into()))
        }

        async fn health_check(&self) -> DomainResult<()> {
            Err(DomainError::Persistence("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_outage_is_a_generic_500() {
        let app = app_with(Arc::new(UnavailableDirectory));

        let resp = register(&app, "a@b.com", "secret1").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("connection refused"));

        let resp = send(&app, get_with_token("/health", None)).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["status"], "degraded");
    }

    #[tokio::test]
    async fn operational_endpoints_respond() {
        let app = app();

        let resp = send(&app, get_with_token("/health", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["user_directory"]["status"], "ok");

        let resp = send(&app, get_with_token("/metrics", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, get_with_token("/api-docs/openapi.json", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let doc = body_json(resp).await;
        assert!(doc["paths"].get("/api/v1/auth/profile").is_some());
        assert!(doc["components"]["securitySchemes"].get("bearer_auth").is_some());
    }
}
