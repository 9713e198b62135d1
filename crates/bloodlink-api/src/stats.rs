use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use bloodlink_types::api::OperationsQuery;

use crate::{AppState, blocking};

const MAX_OPERATIONS: u32 = 100;

pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let stats = blocking(&state, |db| db.get_operations_stats()).await?;
    Ok(Json(stats))
}

/// Most recent successful donations, newest first.
pub async fn recent_operations(
    State(state): State<AppState>,
    Query(query): Query<OperationsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let limit = query.limit.clamp(1, MAX_OPERATIONS);
    let operations = blocking(&state, move |db| db.get_recent_operations(limit)).await?;
    Ok(Json(operations))
}
