use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (donors, requests, donations)");
        conn.execute_batch(
            "
            CREATE TABLE donors (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_handle     INTEGER NOT NULL UNIQUE,
                name            TEXT NOT NULL DEFAULT 'Not provided',
                age             TEXT NOT NULL DEFAULT 'Not provided',
                phone           TEXT NOT NULL DEFAULT 'Not provided',
                gender          TEXT NOT NULL DEFAULT 'Not provided',
                blood_type      TEXT NOT NULL,
                division        TEXT NOT NULL,
                district        TEXT NOT NULL,
                area            TEXT NOT NULL,
                is_restricted   INTEGER NOT NULL DEFAULT 0,
                registered_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_donors_blood_type ON donors(blood_type);

            CREATE TABLE requests (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                requester_handle    INTEGER NOT NULL,
                patient_name        TEXT NOT NULL,
                patient_age         TEXT NOT NULL DEFAULT '',
                hospital_name       TEXT NOT NULL,
                hospital_address    TEXT NOT NULL DEFAULT '',
                area                TEXT NOT NULL DEFAULT '',
                district            TEXT NOT NULL,
                division            TEXT NOT NULL,
                urgency             TEXT NOT NULL DEFAULT 'High',
                phone               TEXT NOT NULL,
                blood_group         TEXT NOT NULL,
                status              TEXT NOT NULL DEFAULT 'active',
                created_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_requests_location
                ON requests(status, division, district);

            CREATE TABLE request_notified_donors (
                request_id  INTEGER NOT NULL REFERENCES requests(id) ON DELETE CASCADE,
                donor_id    INTEGER NOT NULL REFERENCES donors(id) ON DELETE CASCADE,
                notified_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (request_id, donor_id)
            );

            CREATE TABLE donations (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id      INTEGER NOT NULL REFERENCES requests(id) ON DELETE CASCADE,
                donor_id        INTEGER NOT NULL REFERENCES donors(id) ON DELETE CASCADE,
                status          TEXT NOT NULL DEFAULT 'pending',
                accepted_at     TEXT NOT NULL DEFAULT (datetime('now')),
                completed_at    TEXT,
                UNIQUE(request_id, donor_id)
            );

            CREATE INDEX idx_donations_donor ON donations(donor_id, status);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (support inbox)");
        conn.execute_batch(
            "
            CREATE TABLE support_messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_handle INTEGER NOT NULL,
                user_name   TEXT NOT NULL DEFAULT '',
                message     TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'pending',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_support_status ON support_messages(status, created_at);

            CREATE TABLE admin_replies (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_handle INTEGER NOT NULL,
                message     TEXT NOT NULL,
                sent_at     TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
