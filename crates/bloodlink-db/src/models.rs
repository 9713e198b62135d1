//! Database row types, mapped straight from SQLite columns.
//! Conversion into bloodlink-types models happens here so corrupt rows can be
//! reported without failing a whole listing.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use tracing::warn;

use bloodlink_types::models::{
    AdminReply, BloodRequest, Donation, DonationStatus, Donor, DonorId, RequestId, RequestStatus,
    SupportMessage, SupportStatus, Urgency, UserHandle,
};

pub const DONOR_COLUMNS: &str = "id, user_handle, name, age, phone, gender, blood_type, \
     division, district, area, is_restricted, registered_at";

pub const REQUEST_COLUMNS: &str = "id, requester_handle, patient_name, patient_age, \
     hospital_name, hospital_address, area, district, division, urgency, phone, blood_group, \
     status, created_at";

pub const DONATION_COLUMNS: &str =
    "id, request_id, donor_id, status, accepted_at, completed_at";

pub const SUPPORT_COLUMNS: &str = "id, user_handle, user_name, message, status, created_at";

pub const REPLY_COLUMNS: &str = "id, user_handle, message, sent_at";

pub struct DonorRow {
    pub id: i64,
    pub user_handle: i64,
    pub name: String,
    pub age: String,
    pub phone: String,
    pub gender: String,
    pub blood_type: String,
    pub division: String,
    pub district: String,
    pub area: String,
    pub is_restricted: bool,
    pub registered_at: String,
}

impl DonorRow {
    /// Reads `DONOR_COLUMNS` starting at column `base`.
    pub fn read(row: &Row, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(base)?,
            user_handle: row.get(base + 1)?,
            name: row.get(base + 2)?,
            age: row.get(base + 3)?,
            phone: row.get(base + 4)?,
            gender: row.get(base + 5)?,
            blood_type: row.get(base + 6)?,
            division: row.get(base + 7)?,
            district: row.get(base + 8)?,
            area: row.get(base + 9)?,
            is_restricted: row.get(base + 10)?,
            registered_at: row.get(base + 11)?,
        })
    }

    pub fn into_donor(self) -> Result<Donor> {
        let blood_type = self
            .blood_type
            .parse()
            .map_err(|e| anyhow!("Corrupt donor {}: {}", self.id, e))?;

        Ok(Donor {
            id: DonorId(self.id),
            user: UserHandle(self.user_handle),
            name: self.name,
            age: self.age,
            phone: self.phone,
            gender: self.gender,
            blood_type,
            division: self.division,
            district: self.district,
            area: self.area,
            is_restricted: self.is_restricted,
            registered_at: parse_timestamp(&self.registered_at),
        })
    }
}

pub struct RequestRow {
    pub id: i64,
    pub requester_handle: i64,
    pub patient_name: String,
    pub patient_age: String,
    pub hospital_name: String,
    pub hospital_address: String,
    pub area: String,
    pub district: String,
    pub division: String,
    pub urgency: String,
    pub phone: String,
    pub blood_group: String,
    pub status: String,
    pub created_at: String,
}

impl RequestRow {
    /// Reads `REQUEST_COLUMNS` starting at column `base`.
    pub fn read(row: &Row, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(base)?,
            requester_handle: row.get(base + 1)?,
            patient_name: row.get(base + 2)?,
            patient_age: row.get(base + 3)?,
            hospital_name: row.get(base + 4)?,
            hospital_address: row.get(base + 5)?,
            area: row.get(base + 6)?,
            district: row.get(base + 7)?,
            division: row.get(base + 8)?,
            urgency: row.get(base + 9)?,
            phone: row.get(base + 10)?,
            blood_group: row.get(base + 11)?,
            status: row.get(base + 12)?,
            created_at: row.get(base + 13)?,
        })
    }

    pub fn into_request(self) -> BloodRequest {
        let status = self.status.parse().unwrap_or_else(|e| {
            warn!("Request {}: {}, treating as inactive", self.id, e);
            RequestStatus::Inactive
        });
        let urgency = self.urgency.parse().unwrap_or_else(|e| {
            warn!("Request {}: {}, defaulting urgency", self.id, e);
            Urgency::default()
        });

        BloodRequest {
            id: RequestId(self.id),
            requester: UserHandle(self.requester_handle),
            patient_name: self.patient_name,
            patient_age: self.patient_age,
            hospital_name: self.hospital_name,
            hospital_address: self.hospital_address,
            area: self.area,
            district: self.district,
            division: self.division,
            urgency,
            phone: self.phone,
            blood_group: self.blood_group,
            status,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

pub struct DonationRow {
    pub id: i64,
    pub request_id: i64,
    pub donor_id: i64,
    pub status: String,
    pub accepted_at: String,
    pub completed_at: Option<String>,
}

impl DonationRow {
    pub fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            request_id: row.get(1)?,
            donor_id: row.get(2)?,
            status: row.get(3)?,
            accepted_at: row.get(4)?,
            completed_at: row.get(5)?,
        })
    }

    pub fn into_donation(self) -> Result<Donation> {
        let status: DonationStatus = self
            .status
            .parse()
            .map_err(|e| anyhow!("Corrupt donation {}: {}", self.id, e))?;

        Ok(Donation {
            id: self.id,
            request_id: RequestId(self.request_id),
            donor_id: DonorId(self.donor_id),
            status,
            accepted_at: parse_timestamp(&self.accepted_at),
            completed_at: self.completed_at.as_deref().map(parse_timestamp),
        })
    }
}

pub struct SupportRow {
    pub id: i64,
    pub user_handle: i64,
    pub user_name: String,
    pub message: String,
    pub status: String,
    pub created_at: String,
}

impl SupportRow {
    pub fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_handle: row.get(1)?,
            user_name: row.get(2)?,
            message: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    /// Unknown statuses read as pending so nothing drops out of the inbox.
    pub fn into_message(self) -> SupportMessage {
        let status = self.status.parse().unwrap_or_else(|e| {
            warn!("Support message {}: {}", self.id, e);
            SupportStatus::Pending
        });

        SupportMessage {
            id: self.id,
            user: UserHandle(self.user_handle),
            user_name: self.user_name,
            message: self.message,
            status,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

pub fn read_reply(row: &Row) -> rusqlite::Result<AdminReply> {
    let sent_at: String = row.get(3)?;
    Ok(AdminReply {
        id: row.get(0)?,
        user: UserHandle(row.get(1)?),
        message: row.get(2)?,
        sent_at: parse_timestamp(&sent_at),
    })
}

/// Keep the donors that convert cleanly, logging the rest.
pub fn collect_donors(rows: Vec<DonorRow>) -> Vec<Donor> {
    rows.into_iter()
        .filter_map(|row| match row.into_donor() {
            Ok(donor) => Some(donor),
            Err(e) => {
                warn!("Skipping donor row: {}", e);
                None
            }
        })
        .collect()
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC, falling back to RFC 3339.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .or_else(|_| raw.parse::<DateTime<Utc>>())
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
