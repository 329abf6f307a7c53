//! Main application router.

use crate::{
    controllers::{health_controller, user_controller},
    middleware::logging_middleware,
    openapi::api_doc,
    state::AppState,
};
use axum::{http::HeaderValue, middleware, routing::get, Router};
use roster_config::{AppMetadata, ServerConfig};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use utoipa_swagger_ui::SwaggerUi;

/// Creates the main application router.
pub fn create_router(state: AppState, server_config: &ServerConfig, app: &AppMetadata) -> Router {
    let cors = create_cors_layer(server_config);
    let root_message = format!("{} v{}", app.api_title(), app.version);

    let router = Router::new()
        .merge(health_controller::router())
        .nest("/users", user_controller::router())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc(app)))
        .route("/", get(move || async move { root_message }))
        .layer(TimeoutLayer::new(server_config.request_timeout()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware));

    info!("Router created with REST endpoints and Swagger UI at /swagger-ui");
    router
}

/// Creates a CORS layer based on server configuration.
fn create_cors_layer(server_config: &ServerConfig) -> CorsLayer {
    if !server_config.cors_enabled {
        return CorsLayer::new();
    }

    if server_config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server_config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use roster_core::{HealthCheck, HealthStatus, RosterError, RosterResult, UserId};
    use roster_repository::InMemoryUserRepository;
    use roster_service::{
        CreateUserRequest, InMemoryCache, UserResponse, UserService, UserServiceImpl,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct StaticCheck {
        name: &'static str,
        critical: bool,
        status: HealthStatus,
    }

    #[async_trait]
    impl HealthCheck for StaticCheck {
        fn name(&self) -> &str {
            self.name
        }

        fn critical(&self) -> bool {
            self.critical
        }

        async fn check(&self) -> HealthStatus {
            self.status.clone()
        }
    }

    mockall::mock! {
        Service {}

        #[async_trait]
        impl UserService for Service {
            async fn create_user(&self, request: CreateUserRequest) -> RosterResult<UserResponse>;
            async fn get_user(&self, id: UserId) -> RosterResult<UserResponse>;
            async fn list_users(&self) -> RosterResult<Vec<UserResponse>>;
        }
    }

    fn app_with(
        user_service: Arc<dyn UserService>,
        health_checks: Vec<Arc<dyn HealthCheck>>,
    ) -> Router {
        create_router(
            AppState::new(user_service, health_checks),
            &ServerConfig::default(),
            &AppMetadata::default(),
        )
    }

    fn app() -> Router {
        let service = UserServiceImpl::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryCache::new()),
            Duration::from_secs(60),
        );
        app_with(Arc::new(service), Vec::new())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_user(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let app = app();

        let payload = json!({"name": "Ada", "email": "ada@example.com"});
        let (status, body) = send(&app, post_user(&payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"], json!({"id": 1, "name": "Ada", "email": "ada@example.com"}));

        let (status, body) = send(&app, get("/users/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], json!("ada@example.com"));

        let (status, body) = send(&app, get("/users")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let app = app();
        let payload = json!({"name": "Ada", "email": "ada@example.com"});

        send(&app, post_user(&payload)).await;
        let (status, body) = send(&app, post_user(&payload)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["message"], json!("Email 'ada@example.com' already exists"));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (status, body) = send(&app(), get("/users/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], json!("User 99 not found"));
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_bad_request() {
        let (status, body) = send(&app(), get("/users/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_unprocessable() {
        let (status, body) = send(&app(), post_user(&json!({"name": "", "email": "nope"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from("{\"name\":"))
            .unwrap();
        let (status, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("INVALID_JSON"));
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error_without_details() {
        let mut service = MockService::new();
        service
            .expect_list_users()
            .times(1)
            .returning(|| Err(RosterError::Database("password authentication failed".to_string())));

        let (status, body) = send(&app_with(Arc::new(service), Vec::new()), get("/users")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], json!("Internal server error"));
    }

    #[tokio::test]
    async fn test_ready_ignores_degraded_cache() {
        let checks: Vec<Arc<dyn HealthCheck>> = vec![
            Arc::new(StaticCheck {
                name: "database",
                critical: true,
                status: HealthStatus::Healthy,
            }),
            Arc::new(StaticCheck {
                name: "cache",
                critical: false,
                status: HealthStatus::Unhealthy("connection refused".to_string()),
            }),
        ];
        let app = app_with(Arc::new(MockService::new()), checks);
        let (status, body) = send(&app, get("/ready")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ready", "checks": {"database": "up", "cache": "down"}}));
    }

    #[tokio::test]
    async fn test_ready_fails_when_database_is_down() {
        let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(StaticCheck {
            name: "database",
            critical: true,
            status: HealthStatus::Unhealthy("timeout".to_string()),
        })];
        let app = app_with(Arc::new(MockService::new()), checks);
        let (status, body) = send(&app, get("/ready")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], json!("not_ready"));
    }

    #[tokio::test]
    async fn test_health_and_live() {
        let app = app();
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));

        let (status, _) = send(&app, get("/live")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
