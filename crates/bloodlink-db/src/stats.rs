use anyhow::Result;
use rusqlite::params;

use bloodlink_types::BloodType;
use bloodlink_types::models::{
    DonationStatus, DonorId, DonorStats, Operation, OperationsStats, StatsPeriod, TopDonor,
};

use crate::Database;
use crate::models::{DONOR_COLUMNS, DonorRow, REQUEST_COLUMNS, RequestRow, parse_timestamp};
use crate::queries::OptionalExt;

const SUCCESSFUL: &str = "('pending', 'completed')";

impl Database {
    /// Per-status donation counts for a donor, plus their rank among all
    /// donors by successful operations. `None` when the donor is unknown.
    pub fn get_donor_stats(&self, id: DonorId) -> Result<Option<DonorStats>> {
        self.with_conn(|conn| {
            let exists = conn
                .query_row("SELECT 1 FROM donors WHERE id = ?1", [id.0], |_| Ok(()))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let (total, completed, pending, declined): (u32, u32, u32, u32) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'completed'), 0),
                        COALESCE(SUM(status = 'pending'), 0),
                        COALESCE(SUM(status = 'declined'), 0)
                 FROM donations WHERE donor_id = ?1",
                [id.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

            let rank_sql = format!(
                "SELECT position FROM (
                    SELECT d.id AS donor_id,
                           RANK() OVER (ORDER BY COUNT(n.id) DESC) AS position
                    FROM donors d
                    LEFT JOIN donations n ON n.donor_id = d.id AND n.status IN {}
                    GROUP BY d.id
                 ) WHERE donor_id = ?1",
                SUCCESSFUL
            );
            let rank: Option<u32> = conn
                .query_row(&rank_sql, [id.0], |row| row.get(0))
                .optional()?;

            Ok(Some(DonorStats {
                total_donations: total,
                completed_donations: completed,
                pending_donations: pending,
                declined_donations: declined,
                rank,
            }))
        })
    }

    /// Donors with the most successful operations, optionally limited to the
    /// current calendar month or year. Donors with none are left out.
    pub fn get_top_donors(&self, limit: u32, period: Option<StatsPeriod>) -> Result<Vec<TopDonor>> {
        let window = match period {
            Some(StatsPeriod::Month) => {
                "AND strftime('%Y-%m', n.accepted_at) = strftime('%Y-%m', 'now')"
            }
            Some(StatsPeriod::Year) => "AND strftime('%Y', n.accepted_at) = strftime('%Y', 'now')",
            None => "",
        };

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT d.id, d.name, d.blood_type, COUNT(n.id) AS operations
                 FROM donors d
                 JOIN donations n ON n.donor_id = d.id
                 WHERE n.status IN {} {}
                 GROUP BY d.id
                 ORDER BY operations DESC, d.id ASC
                 LIMIT ?1",
                SUCCESSFUL, window
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut top = Vec::with_capacity(rows.len());
            for (id, name, blood_type, count) in rows {
                match blood_type.parse::<BloodType>() {
                    Ok(blood_type) => top.push(TopDonor {
                        donor_id: DonorId(id),
                        name,
                        blood_type,
                        donation_count: count,
                    }),
                    Err(e) => tracing::warn!("Skipping donor {} in rankings: {}", id, e),
                }
            }
            Ok(top)
        })
    }

    pub fn get_operations_stats(&self) -> Result<OperationsStats> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT
                    (SELECT COUNT(*) FROM donors),
                    (SELECT COUNT(*) FROM requests),
                    (SELECT COUNT(*) FROM requests WHERE status = 'active'),
                    (SELECT COUNT(*) FROM donations WHERE status IN {})",
                SUCCESSFUL
            );
            let stats = conn.query_row(&sql, [], |row| {
                Ok(OperationsStats {
                    total_donors: row.get(0)?,
                    total_requests: row.get(1)?,
                    active_requests: row.get(2)?,
                    total_operations: row.get(3)?,
                })
            })?;
            Ok(stats)
        })
    }

    /// Most recent successful operations, newest first, with the request
    /// and donor attached.
    pub fn get_recent_operations(&self, limit: u32) -> Result<Vec<Operation>> {
        // Donation columns occupy 0..3, request columns follow, then donor columns.
        const REQUEST_BASE: usize = 3;
        const DONOR_BASE: usize = REQUEST_BASE + 14;

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT n.id, n.status, n.accepted_at, {}, {}
                 FROM donations n
                 JOIN requests r ON r.id = n.request_id
                 JOIN donors d ON d.id = n.donor_id
                 WHERE n.status IN {}
                 ORDER BY n.accepted_at DESC, n.id DESC
                 LIMIT ?1",
                prefixed(REQUEST_COLUMNS, "r"),
                prefixed(DONOR_COLUMNS, "d"),
                SUCCESSFUL
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        RequestRow::read(row, REQUEST_BASE)?,
                        DonorRow::read(row, DONOR_BASE)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut operations = Vec::with_capacity(rows.len());
            for (donation_id, status, accepted_at, request, donor) in rows {
                let status: DonationStatus = match status.parse() {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!("Skipping operation {}: {}", donation_id, e);
                        continue;
                    }
                };
                let donor = match donor.into_donor() {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Skipping operation {}: {}", donation_id, e);
                        continue;
                    }
                };
                operations.push(Operation {
                    donation_id,
                    operation_date: parse_timestamp(&accepted_at),
                    status,
                    request: request.into_request(),
                    donor,
                });
            }
            Ok(operations)
        })
    }
}

fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodlink_types::models::{NewDonor, NewRequest, RequestId, UserHandle, Urgency};

    fn donor(db: &Database, user: i64) -> DonorId {
        db.save_donor(&NewDonor {
            user: UserHandle(user),
            blood_type: BloodType::OPos,
            division: "dhaka".into(),
            district: "dhaka".into(),
            area: None,
            name: Some(format!("Donor {}", user)),
            phone: Some("0170".into()),
            age: None,
            gender: None,
        })
        .unwrap()
    }

    fn request(db: &Database) -> RequestId {
        db.save_request(&NewRequest {
            requester: UserHandle(500),
            patient_name: "Patient".into(),
            patient_age: "30".into(),
            hospital_name: "General".into(),
            hospital_address: String::new(),
            area: String::new(),
            district: "dhaka".into(),
            division: "dhaka".into(),
            urgency: Urgency::High,
            phone: "0190".into(),
            blood_group: "O+".into(),
        })
        .unwrap()
    }

    #[test]
    fn prefixes_every_column() {
        assert_eq!(prefixed("id, name,status", "x"), "x.id, x.name, x.status");
    }

    #[test]
    fn donor_stats_count_each_status_and_rank() {
        let db = Database::open_in_memory().unwrap();
        let busy = donor(&db, 1);
        let quiet = donor(&db, 2);
        let (r1, r2, r3) = (request(&db), request(&db), request(&db));

        db.record_donor_accepted(r1, busy).unwrap();
        db.record_donor_accepted(r2, busy).unwrap();
        db.mark_donation_completed(r2, busy).unwrap();
        db.record_donor_declined(r3, busy).unwrap();
        db.record_donor_declined(r1, quiet).unwrap();

        let stats = db.get_donor_stats(busy).unwrap().unwrap();
        assert_eq!(stats.total_donations, 3);
        assert_eq!(stats.pending_donations, 1);
        assert_eq!(stats.completed_donations, 1);
        assert_eq!(stats.declined_donations, 1);
        assert_eq!(stats.rank, Some(1));

        let stats = db.get_donor_stats(quiet).unwrap().unwrap();
        assert_eq!(stats.total_donations, 1);
        assert_eq!(stats.rank, Some(2));

        assert!(db.get_donor_stats(DonorId(77)).unwrap().is_none());
    }

    #[test]
    fn top_donors_count_only_successful_operations() {
        let db = Database::open_in_memory().unwrap();
        let a = donor(&db, 1);
        let b = donor(&db, 2);
        let c = donor(&db, 3);
        let (r1, r2) = (request(&db), request(&db));

        db.record_donor_accepted(r1, b).unwrap();
        db.record_donor_accepted(r2, b).unwrap();
        db.record_donor_accepted(r1, a).unwrap();
        db.record_donor_declined(r1, c).unwrap();

        let top = db.get_top_donors(10, None).unwrap();
        let ids: Vec<(DonorId, u32)> = top.iter().map(|t| (t.donor_id, t.donation_count)).collect();
        assert_eq!(ids, vec![(b, 2), (a, 1)]);

        assert_eq!(db.get_top_donors(1, Some(StatsPeriod::Month)).unwrap().len(), 1);
        assert_eq!(db.get_top_donors(10, Some(StatsPeriod::Year)).unwrap().len(), 2);
    }

    #[test]
    fn operations_stats_and_recent_operations() {
        let db = Database::open_in_memory().unwrap();
        let a = donor(&db, 1);
        let b = donor(&db, 2);
        let r1 = request(&db);
        let r2 = request(&db);
        db.update_request_status(r2, bloodlink_types::models::RequestStatus::Fulfilled)
            .unwrap();

        db.record_donor_accepted(r1, a).unwrap();
        db.record_donor_accepted(r2, b).unwrap();
        db.mark_donation_completed(r2, b).unwrap();
        db.record_donor_declined(r2, a).unwrap();

        let stats = db.get_operations_stats().unwrap();
        assert_eq!(
            stats,
            OperationsStats {
                total_donors: 2,
                total_requests: 2,
                active_requests: 1,
                total_operations: 2,
            }
        );

        let recent = db.get_recent_operations(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|op| op.status.is_successful()));
        let pair = recent
            .iter()
            .find(|op| op.donor.id == b)
            .map(|op| (op.request.id, op.status));
        assert_eq!(pair, Some((r2, DonationStatus::Completed)));

        assert_eq!(db.get_recent_operations(1).unwrap().len(), 1);
    }
}
