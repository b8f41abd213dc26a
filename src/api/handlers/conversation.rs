use crate::{
    types::{AppError, ConversationRequest, ConversationResponse, Result},
    AppState,
};
use axum::{extract::State, Json};

/// Run one deliberation on the requested topic
///
/// With an explicit `perspectives` list the router is skipped and exactly
/// those workers are asked; otherwise the mediator picks.
#[utoipa::path(
    post,
    path = "/api/v1/conversation",
    request_body = ConversationRequest,
    responses(
        (status = 200, description = "Synthesized answer", body = ConversationResponse),
        (status = 400, description = "Invalid input"),
        (status = 502, description = "No perspective answered or synthesis failed")
    ),
    tag = "conversation"
)]
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(payload): Json<ConversationRequest>,
) -> Result<Json<ConversationResponse>> {
    if payload.topic.trim().is_empty() {
        return Err(AppError::InvalidInput("topic must not be empty".to_string()));
    }

    tracing::info!(
        user_id = payload.user_id.as_deref().unwrap_or("anonymous"),
        explicit = payload.perspectives.is_some(),
        "Conversation requested"
    );

    let deliberation = match payload.perspectives {
        Some(keys) if !keys.is_empty() => {
            state
                .orchestrator
                .run_detailed(&payload.topic, &keys)
                .await?
        }
        _ => state.orchestrator.route_and_run(&payload.topic).await?,
    };

    Ok(Json(deliberation.into()))
}
