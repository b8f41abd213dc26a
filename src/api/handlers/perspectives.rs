use crate::{types::PerspectiveInfo, AppState};
use axum::{extract::State, Json};

#[utoipa::path(
    get,
    path = "/api/v1/perspectives",
    responses(
        (status = 200, description = "Registered perspectives", body = Vec<PerspectiveInfo>)
    ),
    tag = "conversation"
)]
pub async fn list_perspectives(State(state): State<AppState>) -> Json<Vec<PerspectiveInfo>> {
    let factory = state.orchestrator.factory();

    let perspectives = factory
        .registry()
        .keys()
        .into_iter()
        .filter_map(|key| match factory.get_or_create(&key) {
            Ok(worker) => Some(PerspectiveInfo {
                label: worker.perspective().to_string(),
                key,
            }),
            Err(e) => {
                tracing::warn!(worker = %key, error = %e, "Could not instantiate perspective");
                None
            }
        })
        .collect();

    Json(perspectives)
}
