use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use bloodlink_types::api::{
    CreateRequestResponse, RequestDetailResponse, RequestQuery, UpdateStatusRequest,
};
use bloodlink_types::models::{DonorId, NewRequest, RequestField, RequestId};

use crate::{AppState, bad_body, blocking, engine_status, found};

/// Store the request and offer it to ranked donors. The response lists the
/// donors reached.
pub async fn create_request(
    State(state): State<AppState>,
    body: Result<Json<NewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, StatusCode> {
    let Json(new) = body.map_err(bad_body)?;
    if !is_complete(&new) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let submission = state.engine.submit_request(new).await.map_err(engine_status)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRequestResponse {
            request_id: submission.request_id,
            notified: submission.notified,
        }),
    ))
}

fn is_complete(new: &NewRequest) -> bool {
    [
        &new.patient_name,
        &new.hospital_name,
        &new.division,
        &new.district,
        &new.phone,
        &new.blood_group,
    ]
    .iter()
    .all(|field| !field.trim().is_empty())
}

pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let division = query.division.filter(|d| !d.trim().is_empty());
    let district = query.district.filter(|d| !d.trim().is_empty());

    // A district alone is ambiguous across divisions.
    if division.is_none() && district.is_some() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let requests = blocking(&state, move |db| match division {
        Some(division) => db.get_requests_by_location(&division, district.as_deref()),
        None => db.get_active_requests(),
    })
    .await?;

    Ok(Json(requests))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
) -> Result<impl IntoResponse, StatusCode> {
    let (request, notified_donors) = blocking(&state, move |db| {
        Ok((db.get_request_by_id(id)?, db.get_notified_donors(id)?))
    })
    .await?;

    let request = request.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(RequestDetailResponse {
        request,
        notified_donors,
    }))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<StatusCode, StatusCode> {
    let Json(req) = body.map_err(bad_body)?;
    let status = req.status;

    let updated = blocking(&state, move |db| db.update_request_status(id, status)).await?;
    if updated {
        info!("Request {} marked {}", id, status.as_str());
    }
    found(updated)
}

/// Edit one field from the closed set of editable request fields.
pub async fn update_field(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
    body: Result<Json<RequestField>, JsonRejection>,
) -> Result<StatusCode, StatusCode> {
    let Json(field) = body.map_err(bad_body)?;
    let column = field.column();

    let updated = blocking(&state, move |db| db.update_request_field(id, &field)).await?;
    if updated {
        info!("Request {} field {} updated", id, column);
    }
    found(updated)
}

pub async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
) -> Result<StatusCode, StatusCode> {
    let deleted = blocking(&state, move |db| db.delete_request(id)).await?;
    if deleted {
        info!("Request {} deleted", id);
    }
    found(deleted)
}

/// Confirm a pending donation took place.
pub async fn complete_donation(
    State(state): State<AppState>,
    Path((request_id, donor_id)): Path<(RequestId, DonorId)>,
) -> Result<StatusCode, StatusCode> {
    let completed = blocking(&state, move |db| {
        db.mark_donation_completed(request_id, donor_id)
    })
    .await?;
    if completed {
        info!("Donation by donor {} for request {} completed", donor_id, request_id);
    }
    found(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodlink_types::models::{UserHandle, Urgency};

    fn new_request() -> NewRequest {
        NewRequest {
            requester: UserHandle(7),
            patient_name: "Salma".into(),
            patient_age: String::new(),
            hospital_name: "Chittagong Medical College".into(),
            hospital_address: String::new(),
            area: String::new(),
            district: "chattogram".into(),
            division: "chattogram".into(),
            urgency: Urgency::High,
            phone: "01550000000".into(),
            blood_group: "B-".into(),
        }
    }

    #[test]
    fn optional_fields_may_be_blank() {
        assert!(is_complete(&new_request()));
    }

    #[test]
    fn required_fields_must_be_present() {
        let mut missing_phone = new_request();
        missing_phone.phone = "  ".into();
        assert!(!is_complete(&missing_phone));

        let mut missing_group = new_request();
        missing_group.blood_group = String::new();
        assert!(!is_complete(&missing_group));
    }
}
