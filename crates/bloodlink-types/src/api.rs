use serde::{Deserialize, Serialize};

use crate::models::{
    BloodRequest, Donor, DonorId, DonorStats, RequestId, RequestStatus, StatsPeriod, SupportStatus,
};

// -- Donors --

#[derive(Debug, Serialize)]
pub struct RegisterDonorResponse {
    pub donor_id: DonorId,
    /// Active requests offered to the new donor right after registration.
    pub offered_requests: Vec<RequestId>,
}

#[derive(Debug, Serialize)]
pub struct DonorDetailResponse {
    pub donor: Donor,
    pub stats: DonorStats,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetRestrictionRequest {
    pub restricted: bool,
}

#[derive(Debug, Deserialize)]
pub struct DonorQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopDonorsQuery {
    #[serde(default = "default_top_limit")]
    pub limit: u32,
    pub period: Option<StatsPeriod>,
}

fn default_top_limit() -> u32 {
    10
}

// -- Requests --

#[derive(Debug, Serialize)]
pub struct CreateRequestResponse {
    pub request_id: RequestId,
    /// Donors the offer reached, in rank order.
    pub notified: Vec<DonorId>,
}

#[derive(Debug, Serialize)]
pub struct RequestDetailResponse {
    pub request: BloodRequest,
    pub notified_donors: Vec<DonorId>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: RequestStatus,
}

#[derive(Debug, Deserialize)]
pub struct RequestQuery {
    pub division: Option<String>,
    pub district: Option<String>,
}

// -- Operations --

#[derive(Debug, Deserialize)]
pub struct OperationsQuery {
    #[serde(default = "default_operations_limit")]
    pub limit: u32,
}

fn default_operations_limit() -> u32 {
    10
}

// -- Support inbox --

#[derive(Debug, Deserialize)]
pub struct SupportQuery {
    pub status: Option<SupportStatus>,
    #[serde(default = "default_support_limit")]
    pub limit: u32,
}

fn default_support_limit() -> u32 {
    50
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminReplyRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AdminReplyResponse {
    pub reply_id: i64,
}
