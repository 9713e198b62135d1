use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use bloodlink_types::api::{AdminReplyRequest, AdminReplyResponse, MarkReadResponse, SupportQuery};
use bloodlink_types::models::UserHandle;

use crate::{AppState, bad_body, blocking, engine_status};

const MAX_SUPPORT_MESSAGES: u32 = 200;

/// Support inbox, newest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<SupportQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let limit = query.limit.clamp(1, MAX_SUPPORT_MESSAGES);
    let status = query.status;
    let messages = blocking(&state, move |db| db.get_support_messages(status, limit)).await?;
    Ok(Json(messages))
}

pub async fn mark_read(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let updated = blocking(&state, |db| db.mark_support_read()).await?;
    info!("{} support messages marked read", updated);
    Ok(Json(MarkReadResponse { updated }))
}

/// Send a reply to a chat user over the gateway.
pub async fn reply(
    State(state): State<AppState>,
    Path(user): Path<UserHandle>,
    body: Result<Json<AdminReplyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, StatusCode> {
    let Json(req) = body.map_err(bad_body)?;
    let reply_id = state
        .engine
        .reply_to_user(user, &req.message)
        .await
        .map_err(engine_status)?;
    Ok((StatusCode::CREATED, Json(AdminReplyResponse { reply_id })))
}
