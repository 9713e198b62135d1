use anyhow::Result;
use rusqlite::types::ToSql;
use rusqlite::{Connection, params};

use bloodlink_types::BloodType;
use bloodlink_types::models::{
    BloodRequest, Donation, DonationStatus, Donor, DonorId, DonorUpdate, NewDonor, NewRequest,
    PLACEHOLDER, RequestField, RequestId, RequestStatus, UserHandle, normalize_location,
};

use crate::Database;
use crate::models::{
    DONATION_COLUMNS, DONOR_COLUMNS, DonationRow, DonorRow, REQUEST_COLUMNS, RequestRow,
    collect_donors,
};

impl Database {
    // -- Donors --

    pub fn save_donor(&self, donor: &NewDonor) -> Result<DonorId> {
        let area = donor
            .area
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| normalize_location(&donor.district));

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO donors
                    (user_handle, name, age, phone, gender, blood_type, division, district, area)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    donor.user.0,
                    or_placeholder(donor.name.as_deref()),
                    or_placeholder(donor.age.as_deref()),
                    or_placeholder(donor.phone.as_deref()),
                    or_placeholder(donor.gender.as_deref()),
                    donor.blood_type.as_str(),
                    normalize_location(&donor.division),
                    normalize_location(&donor.district),
                    area,
                ],
            )?;
            Ok(DonorId(conn.last_insert_rowid()))
        })
    }

    pub fn get_donor_by_id(&self, id: DonorId) -> Result<Option<Donor>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM donors WHERE id = ?1", DONOR_COLUMNS);
            let row = conn
                .query_row(&sql, [id.0], |row| DonorRow::read(row, 0))
                .optional()?;
            row.map(DonorRow::into_donor).transpose()
        })
    }

    pub fn get_donor_by_user_handle(&self, user: UserHandle) -> Result<Option<Donor>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM donors WHERE user_handle = ?1", DONOR_COLUMNS);
            let row = conn
                .query_row(&sql, [user.0], |row| DonorRow::read(row, 0))
                .optional()?;
            row.map(DonorRow::into_donor).transpose()
        })
    }

    /// Newest registrations first.
    pub fn get_all_donors(&self) -> Result<Vec<Donor>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM donors ORDER BY registered_at DESC, id DESC",
                DONOR_COLUMNS
            );
            query_donors(conn, &sql, &[])
        })
    }

    /// Donors of the given types in registry order (ascending id),
    /// restricted donors included.
    pub fn get_donors_by_blood_types(&self, types: &[BloodType]) -> Result<Vec<Donor>> {
        if types.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=types.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {} FROM donors WHERE blood_type IN ({}) ORDER BY id ASC",
                DONOR_COLUMNS,
                placeholders.join(", ")
            );

            let names: Vec<&'static str> = types.iter().map(BloodType::as_str).collect();
            let params: Vec<&dyn ToSql> = names.iter().map(|n| n as &dyn ToSql).collect();
            query_donors(conn, &sql, &params)
        })
    }

    /// Case-insensitive substring search over name, blood type, location and phone.
    pub fn search_donors(&self, term: &str) -> Result<Vec<Donor>> {
        let pattern = format!("%{}%", term.trim().to_lowercase());

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM donors
                 WHERE lower(name) LIKE ?1
                    OR lower(blood_type) LIKE ?1
                    OR lower(district) LIKE ?1
                    OR lower(division) LIKE ?1
                    OR lower(phone) LIKE ?1
                 ORDER BY registered_at DESC, id DESC",
                DONOR_COLUMNS
            );
            query_donors(conn, &sql, &[&pattern as &dyn ToSql])
        })
    }

    /// Returns false when the donor does not exist.
    pub fn update_donor(&self, id: DonorId, update: &DonorUpdate) -> Result<bool> {
        let columns = update.columns();
        if columns.is_empty() {
            return Ok(self.get_donor_by_id(id)?.is_some());
        }

        self.with_conn_mut(|conn| {
            let assignments: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, (col, _))| format!("{} = ?{}", col, i + 1))
                .collect();
            let sql = format!(
                "UPDATE donors SET {} WHERE id = ?{}",
                assignments.join(", "),
                columns.len() + 1
            );

            let mut params: Vec<&dyn ToSql> =
                columns.iter().map(|(_, value)| value as &dyn ToSql).collect();
            params.push(&id.0);

            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed > 0)
        })
    }

    /// Deletes the donor together with their donations and notifications.
    pub fn delete_donor(&self, id: DonorId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM donors WHERE id = ?1", [id.0])?;
            Ok(changed > 0)
        })
    }

    pub fn set_donor_restricted(&self, id: DonorId, restricted: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE donors SET is_restricted = ?1 WHERE id = ?2",
                params![restricted, id.0],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Requests --

    pub fn save_request(&self, request: &NewRequest) -> Result<RequestId> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO requests
                    (requester_handle, patient_name, patient_age, hospital_name, hospital_address,
                     area, district, division, urgency, phone, blood_group, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    request.requester.0,
                    request.patient_name.trim(),
                    request.patient_age.trim(),
                    request.hospital_name.trim(),
                    request.hospital_address.trim(),
                    request.area.trim(),
                    normalize_location(&request.district),
                    normalize_location(&request.division),
                    request.urgency.as_str(),
                    request.phone.trim(),
                    request.blood_group.trim(),
                    RequestStatus::Active.as_str(),
                ],
            )?;
            Ok(RequestId(conn.last_insert_rowid()))
        })
    }

    pub fn get_request_by_id(&self, id: RequestId) -> Result<Option<BloodRequest>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM requests WHERE id = ?1", REQUEST_COLUMNS);
            let row = conn
                .query_row(&sql, [id.0], |row| RequestRow::read(row, 0))
                .optional()?;
            Ok(row.map(RequestRow::into_request))
        })
    }

    /// Active requests, newest first.
    pub fn get_active_requests(&self) -> Result<Vec<BloodRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM requests WHERE status = 'active'
                 ORDER BY created_at DESC, id DESC",
                REQUEST_COLUMNS
            );
            query_requests(conn, &sql, &[])
        })
    }

    /// Active requests in a division, optionally narrowed to one district.
    pub fn get_requests_by_location(
        &self,
        division: &str,
        district: Option<&str>,
    ) -> Result<Vec<BloodRequest>> {
        let division = normalize_location(division);
        let district = district.map(normalize_location);

        self.with_conn(|conn| match &district {
            Some(district) => {
                let sql = format!(
                    "SELECT {} FROM requests
                     WHERE status = 'active' AND lower(division) = ?1 AND lower(district) = ?2
                     ORDER BY created_at DESC, id DESC",
                    REQUEST_COLUMNS
                );
                query_requests(conn, &sql, &[&division as &dyn ToSql, district as &dyn ToSql])
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM requests
                     WHERE status = 'active' AND lower(division) = ?1
                     ORDER BY created_at DESC, id DESC",
                    REQUEST_COLUMNS
                );
                query_requests(conn, &sql, &[&division as &dyn ToSql])
            }
        })
    }

    pub fn update_request_status(&self, id: RequestId, status: RequestStatus) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE requests SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.0],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_request_field(&self, id: RequestId, field: &RequestField) -> Result<bool> {
        // Column names come from a closed enum, never from caller input.
        let sql = format!("UPDATE requests SET {} = ?1 WHERE id = ?2", field.column());
        let value = field.value();

        self.with_conn_mut(|conn| {
            let changed = conn.execute(&sql, params![value, id.0])?;
            Ok(changed > 0)
        })
    }

    /// Union the given donors into the request's notified set.
    /// Returns how many were not already present.
    pub fn merge_notified_donors(&self, id: RequestId, donors: &[DonorId]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut added = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO request_notified_donors (request_id, donor_id)
                     VALUES (?1, ?2)",
                )?;
                for donor in donors {
                    added += stmt.execute(params![id.0, donor.0])?;
                }
            }
            tx.commit()?;
            Ok(added)
        })
    }

    /// Notified donors in the order they were first recorded.
    pub fn get_notified_donors(&self, id: RequestId) -> Result<Vec<DonorId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT donor_id FROM request_notified_donors
                 WHERE request_id = ?1 ORDER BY rowid ASC",
            )?;
            let ids = stmt
                .query_map([id.0], |row| row.get::<_, i64>(0).map(DonorId))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Deletes the request; donations and notifications cascade.
    pub fn delete_request(&self, id: RequestId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM requests WHERE id = ?1", [id.0])?;
            Ok(changed > 0)
        })
    }

    // -- Donations --

    /// Create or reset the (request, donor) donation to `pending`, stamped now.
    /// A `completed` donation is never moved.
    pub fn record_donor_accepted(&self, request: RequestId, donor: DonorId) -> Result<()> {
        self.upsert_donation(request, donor, DonationStatus::Pending)
    }

    /// Create or reset the (request, donor) donation to `declined`, stamped now.
    pub fn record_donor_declined(&self, request: RequestId, donor: DonorId) -> Result<()> {
        self.upsert_donation(request, donor, DonationStatus::Declined)
    }

    fn upsert_donation(
        &self,
        request: RequestId,
        donor: DonorId,
        status: DonationStatus,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO donations (request_id, donor_id, status, accepted_at)
                 VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT(request_id, donor_id) DO UPDATE SET
                    status = excluded.status,
                    accepted_at = excluded.accepted_at,
                    completed_at = NULL
                 WHERE donations.status <> 'completed'",
                params![request.0, donor.0, status.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn get_donation(&self, request: RequestId, donor: DonorId) -> Result<Option<Donation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM donations WHERE request_id = ?1 AND donor_id = ?2",
                DONATION_COLUMNS
            );
            let row = conn
                .query_row(&sql, params![request.0, donor.0], DonationRow::read)
                .optional()?;
            row.map(DonationRow::into_donation).transpose()
        })
    }

    /// Donations against the request that count as successful operations.
    pub fn count_successful_donations(&self, request: RequestId) -> Result<u32> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM donations
                 WHERE request_id = ?1 AND status IN ('pending', 'completed')",
                [request.0],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Confirm a committed donation took place. Only `pending` donations move.
    pub fn mark_donation_completed(&self, request: RequestId, donor: DonorId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE donations SET status = 'completed', completed_at = datetime('now')
                 WHERE request_id = ?1 AND donor_id = ?2 AND status = 'pending'",
                params![request.0, donor.0],
            )?;
            Ok(changed > 0)
        })
    }
}

fn or_placeholder(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

fn query_donors(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Donor>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| DonorRow::read(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(collect_donors(rows))
}

fn query_requests(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<BloodRequest>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| RequestRow::read(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(RequestRow::into_request).collect())
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodlink_types::models::Urgency;

    fn new_donor(user: i64, blood: BloodType, division: &str, district: &str) -> NewDonor {
        NewDonor {
            user: UserHandle(user),
            blood_type: blood,
            division: division.to_string(),
            district: district.to_string(),
            area: None,
            name: None,
            phone: None,
            age: None,
            gender: None,
        }
    }

    fn new_request(blood: &str) -> NewRequest {
        NewRequest {
            requester: UserHandle(900),
            patient_name: "Karim".into(),
            patient_age: "45".into(),
            hospital_name: "Dhaka Medical".into(),
            hospital_address: "Bakshibazar".into(),
            area: "Lalbagh".into(),
            district: "Dhaka".into(),
            division: "Dhaka".into(),
            urgency: Urgency::Urgent,
            phone: "01700000000".into(),
            blood_group: blood.into(),
        }
    }

    #[test]
    fn saves_minimal_donor_with_placeholders() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .save_donor(&new_donor(1, BloodType::ONeg, " Dhaka ", "GAZIPUR"))
            .unwrap();

        let donor = db.get_donor_by_id(id).unwrap().unwrap();
        assert_eq!(donor.name, PLACEHOLDER);
        assert_eq!(donor.phone, PLACEHOLDER);
        assert_eq!(donor.division, "dhaka");
        assert_eq!(donor.district, "gazipur");
        assert_eq!(donor.area, "gazipur");
        assert!(!donor.has_complete_profile());

        let same = db.get_donor_by_user_handle(UserHandle(1)).unwrap().unwrap();
        assert_eq!(same.id, id);
    }

    #[test]
    fn duplicate_user_handle_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.save_donor(&new_donor(1, BloodType::ONeg, "dhaka", "dhaka")).unwrap();
        assert!(db.save_donor(&new_donor(1, BloodType::APos, "dhaka", "dhaka")).is_err());
    }

    #[test]
    fn donors_by_blood_types_in_registry_order() {
        let db = Database::open_in_memory().unwrap();
        let a = db.save_donor(&new_donor(1, BloodType::APos, "dhaka", "dhaka")).unwrap();
        db.save_donor(&new_donor(2, BloodType::BPos, "dhaka", "dhaka")).unwrap();
        let c = db.save_donor(&new_donor(3, BloodType::ONeg, "sylhet", "sylhet")).unwrap();

        let found = db
            .get_donors_by_blood_types(&[BloodType::ONeg, BloodType::APos])
            .unwrap();
        let ids: Vec<DonorId> = found.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert!(db.get_donors_by_blood_types(&[]).unwrap().is_empty());
    }

    #[test]
    fn update_donor_sets_contact_and_keeps_blood_type() {
        let db = Database::open_in_memory().unwrap();
        let id = db.save_donor(&new_donor(1, BloodType::BNeg, "dhaka", "dhaka")).unwrap();

        assert!(db.update_donor(id, &DonorUpdate::contact("Rahim", "01811111111")).unwrap());
        let donor = db.get_donor_by_id(id).unwrap().unwrap();
        assert_eq!(donor.name, "Rahim");
        assert_eq!(donor.phone, "01811111111");
        assert_eq!(donor.blood_type, BloodType::BNeg);
        assert!(donor.has_complete_profile());

        assert!(!db.update_donor(DonorId(999), &DonorUpdate::contact("x", "y")).unwrap());
    }

    #[test]
    fn search_matches_name_and_location() {
        let db = Database::open_in_memory().unwrap();
        let id = db.save_donor(&new_donor(1, BloodType::APos, "Dhaka", "Gazipur")).unwrap();
        db.update_donor(id, &DonorUpdate::contact("Rahim Uddin", "0181")).unwrap();
        db.save_donor(&new_donor(2, BloodType::ONeg, "Sylhet", "Sylhet")).unwrap();

        assert_eq!(db.search_donors("rahim").unwrap().len(), 1);
        assert_eq!(db.search_donors("GAZI").unwrap().len(), 1);
        assert_eq!(db.search_donors("sylhet").unwrap().len(), 1);
        assert!(db.search_donors("nobody").unwrap().is_empty());
    }

    #[test]
    fn restriction_flag_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let id = db.save_donor(&new_donor(1, BloodType::APos, "dhaka", "dhaka")).unwrap();
        assert!(db.set_donor_restricted(id, true).unwrap());
        assert!(db.get_donor_by_id(id).unwrap().unwrap().is_restricted);
        assert!(!db.set_donor_restricted(DonorId(42), true).unwrap());
    }

    #[test]
    fn merge_notified_donors_is_a_union() {
        let db = Database::open_in_memory().unwrap();
        let d1 = db.save_donor(&new_donor(1, BloodType::ONeg, "dhaka", "dhaka")).unwrap();
        let d2 = db.save_donor(&new_donor(2, BloodType::ONeg, "dhaka", "dhaka")).unwrap();
        let d3 = db.save_donor(&new_donor(3, BloodType::ONeg, "dhaka", "dhaka")).unwrap();
        let req = db.save_request(&new_request("A+")).unwrap();

        assert_eq!(db.merge_notified_donors(req, &[d1, d2]).unwrap(), 2);
        assert_eq!(db.merge_notified_donors(req, &[d2, d3]).unwrap(), 1);
        assert_eq!(db.merge_notified_donors(req, &[]).unwrap(), 0);
        assert_eq!(db.get_notified_donors(req).unwrap(), vec![d1, d2, d3]);
    }

    #[test]
    fn requests_by_location_only_returns_active() {
        let db = Database::open_in_memory().unwrap();
        let r1 = db.save_request(&new_request("A+")).unwrap();
        let mut other = new_request("B+");
        other.district = "Gazipur".into();
        let r2 = db.save_request(&other).unwrap();

        assert_eq!(db.get_requests_by_location("DHAKA", None).unwrap().len(), 2);
        let exact = db.get_requests_by_location("dhaka", Some("gazipur")).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, r2);

        db.update_request_status(r1, RequestStatus::Fulfilled).unwrap();
        let active: Vec<RequestId> =
            db.get_active_requests().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(active, vec![r2]);
    }

    #[test]
    fn update_request_field_edits_one_column() {
        let db = Database::open_in_memory().unwrap();
        let id = db.save_request(&new_request("O+")).unwrap();

        assert!(db.update_request_field(id, &RequestField::Urgency(Urgency::Low)).unwrap());
        assert!(db
            .update_request_field(id, &RequestField::HospitalName("Square".into()))
            .unwrap());

        let req = db.get_request_by_id(id).unwrap().unwrap();
        assert_eq!(req.urgency, Urgency::Low);
        assert_eq!(req.hospital_name, "Square");
        assert_eq!(req.patient_name, "Karim");
    }

    #[test]
    fn donation_upsert_keeps_one_row_per_pair() {
        let db = Database::open_in_memory().unwrap();
        let donor = db.save_donor(&new_donor(1, BloodType::ONeg, "dhaka", "dhaka")).unwrap();
        let req = db.save_request(&new_request("A+")).unwrap();

        db.record_donor_declined(req, donor).unwrap();
        assert_eq!(
            db.get_donation(req, donor).unwrap().unwrap().status,
            DonationStatus::Declined
        );
        assert_eq!(db.count_successful_donations(req).unwrap(), 0);

        db.record_donor_accepted(req, donor).unwrap();
        let donation = db.get_donation(req, donor).unwrap().unwrap();
        assert_eq!(donation.status, DonationStatus::Pending);
        assert_eq!(db.count_successful_donations(req).unwrap(), 1);

        assert!(db.mark_donation_completed(req, donor).unwrap());
        assert!(!db.mark_donation_completed(req, donor).unwrap());
        let done = db.get_donation(req, donor).unwrap().unwrap();
        assert_eq!(done.status, DonationStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.id, donation.id);
    }

    #[test]
    fn completed_donation_is_not_overwritten() {
        let db = Database::open_in_memory().unwrap();
        let donor = db.save_donor(&new_donor(1, BloodType::ONeg, "dhaka", "dhaka")).unwrap();
        let req = db.save_request(&new_request("A+")).unwrap();

        db.record_donor_accepted(req, donor).unwrap();
        assert!(db.mark_donation_completed(req, donor).unwrap());

        db.record_donor_declined(req, donor).unwrap();
        db.record_donor_accepted(req, donor).unwrap();

        let done = db.get_donation(req, donor).unwrap().unwrap();
        assert_eq!(done.status, DonationStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(db.count_successful_donations(req).unwrap(), 1);
    }

    #[test]
    fn delete_request_cascades() {
        let db = Database::open_in_memory().unwrap();
        let donor = db.save_donor(&new_donor(1, BloodType::ONeg, "dhaka", "dhaka")).unwrap();
        let req = db.save_request(&new_request("A+")).unwrap();
        db.merge_notified_donors(req, &[donor]).unwrap();
        db.record_donor_accepted(req, donor).unwrap();

        assert!(db.delete_request(req).unwrap());
        assert!(db.get_request_by_id(req).unwrap().is_none());
        assert!(db.get_donation(req, donor).unwrap().is_none());
        assert!(db.get_notified_donors(req).unwrap().is_empty());
        assert!(!db.delete_request(req).unwrap());
    }

    #[test]
    fn delete_donor_removes_their_donations() {
        let db = Database::open_in_memory().unwrap();
        let donor = db.save_donor(&new_donor(1, BloodType::ONeg, "dhaka", "dhaka")).unwrap();
        let req = db.save_request(&new_request("A+")).unwrap();
        db.record_donor_accepted(req, donor).unwrap();

        assert!(db.delete_donor(donor).unwrap());
        assert!(db.get_donor_by_id(donor).unwrap().is_none());
        assert_eq!(db.count_successful_donations(req).unwrap(), 0);
    }
}
