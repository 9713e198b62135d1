pub mod donors;
pub mod middleware;
pub mod requests;
pub mod stats;
pub mod support;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use tracing::{error, warn};

use bloodlink_db::Database;
use bloodlink_engine::{AdminPolicy, Engine, EngineError};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub engine: Engine,
    pub admin: AdminPolicy,
}

/// Run a store call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Store failure: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

pub(crate) fn engine_status(e: EngineError) -> StatusCode {
    match e {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        EngineError::DeliveryFailure(e) => {
            warn!("Gateway failure during request: {}", e);
            StatusCode::BAD_GATEWAY
        }
        EngineError::PersistenceFailure(e) => {
            error!("Store failure: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// axum answers some body errors with 422; every unusable body is a 400 here.
pub(crate) fn bad_body(rejection: JsonRejection) -> StatusCode {
    warn!("Rejected request body: {}", rejection.body_text());
    StatusCode::BAD_REQUEST
}

pub(crate) fn found(updated: bool) -> Result<StatusCode, StatusCode> {
    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_statuses() {
        assert_eq!(engine_status(EngineError::NotFound("request")), StatusCode::NOT_FOUND);
        assert_eq!(
            engine_status(EngineError::MalformedInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            engine_status(EngineError::PersistenceFailure(anyhow::anyhow!("locked"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_rows_are_not_found() {
        assert_eq!(found(true), Ok(StatusCode::NO_CONTENT));
        assert_eq!(found(false), Err(StatusCode::NOT_FOUND));
    }
}
