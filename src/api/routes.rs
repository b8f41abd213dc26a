use crate::api::handlers::{conversation, health, health::HealthResponse, perspectives};
use crate::types::{
    AggregateResult, ConversationRequest, ConversationResponse, PerspectiveInfo, SynthesisPath,
    WorkerResponse,
};
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Parley", description = "Multi-perspective deliberation API"),
    paths(
        conversation::create_conversation,
        perspectives::list_perspectives,
        health::health_check
    ),
    components(schemas(
        ConversationRequest,
        ConversationResponse,
        PerspectiveInfo,
        AggregateResult,
        WorkerResponse,
        SynthesisPath,
        HealthResponse
    )),
    tags(
        (name = "conversation", description = "Deliberation endpoints"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Routes mounted under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/v1/conversation", post(conversation::create_conversation))
        .route("/v1/perspectives", get(perspectives::list_perspectives))
        .route("/health", get(health::health_check))
}

#[cfg(not(feature = "swagger-ui"))]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}

/// Complete application: API routes, OpenAPI document, tracing and CORS
pub fn build_app(state: AppState) -> Router {
    let router = Router::new().nest("/api", create_router());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route("/api-docs/openapi.json", get(openapi_json));

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
