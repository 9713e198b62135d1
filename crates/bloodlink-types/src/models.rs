use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blood::BloodType;

/// Stored in profile fields that have not been collected yet.
pub const PLACEHOLDER: &str = "Not provided";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseFieldError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! id_type {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseFieldError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map($name).map_err(|_| ParseFieldError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

id_type!(DonorId, "donor id");
id_type!(RequestId, "request id");
id_type!(UserHandle, "user handle");

/// True when a profile field holds real data rather than the placeholder.
pub fn is_provided(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case(PLACEHOLDER)
}

/// Lowercased, trimmed form used to store and compare divisions and districts.
pub fn normalize_location(value: &str) -> String {
    value.trim().to_lowercase()
}

// -- Donors --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub id: DonorId,
    pub user: UserHandle,
    pub name: String,
    pub age: String,
    pub phone: String,
    pub gender: String,
    pub blood_type: BloodType,
    pub division: String,
    pub district: String,
    pub area: String,
    pub is_restricted: bool,
    pub registered_at: DateTime<Utc>,
}

impl Donor {
    /// Name and phone are both known, so the donor can be introduced to a requester.
    pub fn has_complete_profile(&self) -> bool {
        is_provided(&self.name) && is_provided(&self.phone)
    }
}

/// Minimal registration data. Missing profile fields fall back to the placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDonor {
    pub user: UserHandle,
    pub blood_type: BloodType,
    pub division: String,
    pub district: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

/// Partial update of a donor profile. Blood type cannot change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorUpdate {
    pub name: Option<String>,
    pub age: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub division: Option<String>,
    pub district: Option<String>,
    pub area: Option<String>,
}

impl DonorUpdate {
    pub fn contact(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            phone: Some(phone.into()),
            ..Self::default()
        }
    }

    /// (column, value) pairs for every field present, locations normalized.
    pub fn columns(&self) -> Vec<(&'static str, String)> {
        let mut cols = Vec::new();
        if let Some(v) = &self.name {
            cols.push(("name", v.trim().to_string()));
        }
        if let Some(v) = &self.age {
            cols.push(("age", v.trim().to_string()));
        }
        if let Some(v) = &self.phone {
            cols.push(("phone", v.trim().to_string()));
        }
        if let Some(v) = &self.gender {
            cols.push(("gender", v.trim().to_string()));
        }
        if let Some(v) = &self.division {
            cols.push(("division", normalize_location(v)));
        }
        if let Some(v) = &self.district {
            cols.push(("district", normalize_location(v)));
        }
        if let Some(v) = &self.area {
            cols.push(("area", v.trim().to_string()));
        }
        cols
    }
}

// -- Requests --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Active,
    Fulfilled,
    Inactive,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Fulfilled => "fulfilled",
            Self::Inactive => "inactive",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "fulfilled" => Ok(Self::Fulfilled),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ParseFieldError {
                kind: "request status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Urgency {
    Urgent,
    #[default]
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Self::Urgent),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseFieldError {
                kind: "urgency",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: RequestId,
    pub requester: UserHandle,
    pub patient_name: String,
    pub patient_age: String,
    pub hospital_name: String,
    pub hospital_address: String,
    pub area: String,
    pub district: String,
    pub division: String,
    pub urgency: Urgency,
    pub phone: String,
    /// Raw value as submitted; see [`BloodRequest::blood_type`].
    pub blood_group: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl BloodRequest {
    /// `None` for unknown or malformed values, which match no donor.
    pub fn blood_type(&self) -> Option<BloodType> {
        self.blood_group.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
    pub requester: UserHandle,
    pub patient_name: String,
    #[serde(default)]
    pub patient_age: String,
    pub hospital_name: String,
    #[serde(default)]
    pub hospital_address: String,
    #[serde(default)]
    pub area: String,
    pub district: String,
    pub division: String,
    #[serde(default)]
    pub urgency: Urgency,
    pub phone: String,
    pub blood_group: String,
}

/// The closed set of request fields an administrator may edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum RequestField {
    PatientName(String),
    PatientAge(String),
    HospitalName(String),
    HospitalAddress(String),
    Area(String),
    Phone(String),
    Urgency(Urgency),
}

impl RequestField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::PatientName(_) => "patient_name",
            Self::PatientAge(_) => "patient_age",
            Self::HospitalName(_) => "hospital_name",
            Self::HospitalAddress(_) => "hospital_address",
            Self::Area(_) => "area",
            Self::Phone(_) => "phone",
            Self::Urgency(_) => "urgency",
        }
    }

    pub fn value(&self) -> String {
        match self {
            Self::PatientName(v)
            | Self::PatientAge(v)
            | Self::HospitalName(v)
            | Self::HospitalAddress(v)
            | Self::Area(v)
            | Self::Phone(v) => v.trim().to_string(),
            Self::Urgency(u) => u.as_str().to_string(),
        }
    }
}

// -- Donations --

/// `Pending` means committed but not yet confirmed as medically completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Declined,
    Completed,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Declined => "declined",
            Self::Completed => "completed",
        }
    }

    /// Counts as a successful operation in statistics.
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Pending | Self::Completed)
    }
}

impl FromStr for DonationStatus {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "declined" => Ok(Self::Declined),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseFieldError {
                kind: "donation status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub request_id: RequestId,
    pub donor_id: DonorId,
    pub status: DonationStatus,
    pub accepted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// -- Statistics --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorStats {
    pub total_donations: u32,
    pub completed_donations: u32,
    pub pending_donations: u32,
    pub declined_donations: u32,
    /// Rank by successful operations (1 = most); `None` for unknown donors.
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopDonor {
    pub donor_id: DonorId,
    pub name: String,
    pub blood_type: BloodType,
    pub donation_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Month,
    Year,
}

impl FromStr for StatsPeriod {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(ParseFieldError {
                kind: "stats period",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationsStats {
    pub total_donors: u32,
    pub total_requests: u32,
    pub active_requests: u32,
    pub total_operations: u32,
}

/// One successful donation with both parties attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub donation_id: i64,
    pub operation_date: DateTime<Utc>,
    pub status: DonationStatus,
    pub request: BloodRequest,
    pub donor: Donor,
}

// -- Support inbox --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportStatus {
    Pending,
    Read,
}

impl SupportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Read => "read",
        }
    }
}

impl FromStr for SupportStatus {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "read" => Ok(Self::Read),
            _ => Err(ParseFieldError {
                kind: "support status",
                value: s.to_string(),
            }),
        }
    }
}

/// Feedback or a support question a chat user sent to the administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: i64,
    pub user: UserHandle,
    /// Display name at the time of sending; empty when unknown.
    pub user_name: String,
    pub message: String,
    pub status: SupportStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminReply {
    pub id: i64,
    pub user: UserHandle,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}
