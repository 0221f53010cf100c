use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::models::response::{ResponseAck, ResponsePayload};
use crate::models::session::{SessionCreate, SessionCreateResponse};
use crate::state::AppState;
use crate::validation::ValidJson;

/// POST /session
pub async fn handle_create_session(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SessionCreate>,
) -> Result<Json<SessionCreateResponse>, AppError> {
    let session_id = state.store.create_session(req.founder_inputs).await?;
    Ok(Json(SessionCreateResponse { session_id }))
}

/// POST /responses
pub async fn handle_store_response(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ResponsePayload>,
) -> Result<Json<ResponseAck>, AppError> {
    let ack = state.store.store_response(payload).await?;
    Ok(Json(ack))
}

/// POST /response
/// Older clients post to the singular path; same payload, same stored output.
pub async fn handle_store_response_alias(
    state: State<AppState>,
    payload: ValidJson<ResponsePayload>,
) -> Result<Json<ResponseAck>, AppError> {
    handle_store_response(state, payload).await
}
