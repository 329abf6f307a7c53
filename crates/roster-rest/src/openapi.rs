//! OpenAPI documentation configuration.

use crate::controllers::{HealthResponse, ReadinessResponse};
use roster_config::AppMetadata;
use roster_core::{ErrorResponse, FieldError, UserId};
use roster_service::{CreateUserRequest, UserResponse};
use utoipa::OpenApi;

/// OpenAPI documentation for the Roster API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Roster API",
        version = "1.0.0",
        description = "User directory API",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    paths(
        // User endpoints
        crate::controllers::user_controller::create_user,
        crate::controllers::user_controller::get_user,
        crate::controllers::user_controller::list_users,
        // Health endpoints
        crate::controllers::health_controller::health_check,
        crate::controllers::health_controller::readiness_check,
        crate::controllers::health_controller::liveness_check,
    ),
    components(
        schemas(
            UserId,
            ErrorResponse,
            FieldError,
            CreateUserRequest,
            UserResponse,
            HealthResponse,
            ReadinessResponse,
        )
    ),
    tags(
        (name = "users", description = "User management endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Builds the OpenAPI document, titled after the configured company name.
#[must_use]
pub fn api_doc(app: &AppMetadata) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = app.api_title();
    doc.info.description = Some(app.api_description());
    doc.info.version.clone_from(&app.version);
    doc
}
