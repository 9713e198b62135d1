use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use bloodlink_engine::Registration;
use bloodlink_types::api::{
    DonorDetailResponse, DonorQuery, RegisterDonorResponse, SetRestrictionRequest, TopDonorsQuery,
};
use bloodlink_types::models::{DonorId, NewDonor};

use crate::{AppState, bad_body, blocking, engine_status, found};

const MAX_TOP_DONORS: u32 = 100;

/// First contact from a chat user. Matching recent requests are offered
/// over the gateway before the response is sent.
pub async fn register_donor(
    State(state): State<AppState>,
    body: Result<Json<NewDonor>, JsonRejection>,
) -> Result<impl IntoResponse, StatusCode> {
    let Json(new) = body.map_err(bad_body)?;
    if new.division.trim().is_empty() || new.district.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.engine.register_donor(new).await.map_err(engine_status)? {
        Registration::Registered { donor_id, offered } => Ok((
            StatusCode::CREATED,
            Json(RegisterDonorResponse {
                donor_id,
                offered_requests: offered,
            }),
        )),
        Registration::AlreadyRegistered(existing) => {
            info!("Registration refused, already registered as donor {}", existing);
            Err(StatusCode::CONFLICT)
        }
    }
}

pub async fn list_donors(
    State(state): State<AppState>,
    Query(query): Query<DonorQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let term = query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let donors = blocking(&state, move |db| match term {
        Some(term) => db.search_donors(&term),
        None => db.get_all_donors(),
    })
    .await?;

    Ok(Json(donors))
}

pub async fn get_donor(
    State(state): State<AppState>,
    Path(id): Path<DonorId>,
) -> Result<impl IntoResponse, StatusCode> {
    let (donor, stats) =
        blocking(&state, move |db| Ok((db.get_donor_by_id(id)?, db.get_donor_stats(id)?))).await?;

    let donor = donor.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(DonorDetailResponse {
        donor,
        stats: stats.unwrap_or_default(),
    }))
}

pub async fn top_donors(
    State(state): State<AppState>,
    Query(query): Query<TopDonorsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let limit = query.limit.clamp(1, MAX_TOP_DONORS);
    let period = query.period;

    let top = blocking(&state, move |db| db.get_top_donors(limit, period)).await?;
    Ok(Json(top))
}

pub async fn set_restriction(
    State(state): State<AppState>,
    Path(id): Path<DonorId>,
    body: Result<Json<SetRestrictionRequest>, JsonRejection>,
) -> Result<StatusCode, StatusCode> {
    let Json(req) = body.map_err(bad_body)?;
    let restricted = req.restricted;

    let updated = blocking(&state, move |db| db.set_donor_restricted(id, restricted)).await?;
    if updated {
        info!(
            "Donor {} {}",
            id,
            if restricted { "restricted" } else { "unrestricted" }
        );
    }
    found(updated)
}

pub async fn delete_donor(
    State(state): State<AppState>,
    Path(id): Path<DonorId>,
) -> Result<StatusCode, StatusCode> {
    let deleted = blocking(&state, move |db| db.delete_donor(id)).await?;
    if deleted {
        info!("Donor {} deleted", id);
    }
    found(deleted)
}
