use anyhow::Result;
use rusqlite::params;

use bloodlink_types::models::{AdminReply, SupportMessage, SupportStatus, UserHandle};

use crate::Database;
use crate::models::{REPLY_COLUMNS, SUPPORT_COLUMNS, SupportRow, read_reply};

impl Database {
    /// Store a message for the administrator as `pending`.
    pub fn store_support_message(
        &self,
        user: UserHandle,
        user_name: &str,
        message: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO support_messages (user_handle, user_name, message)
                 VALUES (?1, ?2, ?3)",
                params![user.0, user_name.trim(), message.trim()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest first, optionally only one status.
    pub fn get_support_messages(
        &self,
        status: Option<SupportStatus>,
        limit: u32,
    ) -> Result<Vec<SupportMessage>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM support_messages
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
                SUPPORT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![status.map(|s| s.as_str()), limit], SupportRow::read)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(SupportRow::into_message).collect())
        })
    }

    /// Mark every pending message read. Returns how many moved.
    pub fn mark_support_read(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE support_messages SET status = 'read' WHERE status = 'pending'",
                [],
            )?;
            Ok(changed)
        })
    }

    pub fn record_admin_reply(&self, user: UserHandle, message: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admin_replies (user_handle, message) VALUES (?1, ?2)",
                params![user.0, message],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Replies sent to one user, oldest first.
    pub fn get_admin_replies(&self, user: UserHandle) -> Result<Vec<AdminReply>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM admin_replies WHERE user_handle = ?1 ORDER BY id",
                REPLY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let replies = stmt
                .query_map([user.0], read_reply)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(replies)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_lists_newest_first_and_filters_by_status() {
        let db = Database::open_in_memory().unwrap();
        let first = db.store_support_message(UserHandle(7), "Rahim", " Thanks! ").unwrap();
        let second = db.store_support_message(UserHandle(8), "", "Donor never came").unwrap();

        let all = db.get_support_messages(None, 10).unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(all[1].message, "Thanks!");
        assert_eq!(all[1].user, UserHandle(7));
        assert!(all.iter().all(|m| m.status == SupportStatus::Pending));

        assert_eq!(db.get_support_messages(None, 1).unwrap().len(), 1);
        assert!(db.get_support_messages(Some(SupportStatus::Read), 10).unwrap().is_empty());
    }

    #[test]
    fn mark_read_moves_only_pending_messages() {
        let db = Database::open_in_memory().unwrap();
        db.store_support_message(UserHandle(7), "Rahim", "one").unwrap();
        db.store_support_message(UserHandle(7), "Rahim", "two").unwrap();

        assert_eq!(db.mark_support_read().unwrap(), 2);
        assert_eq!(db.mark_support_read().unwrap(), 0);

        db.store_support_message(UserHandle(9), "Karim", "three").unwrap();
        let pending = db.get_support_messages(Some(SupportStatus::Pending), 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message, "three");
        assert_eq!(db.get_support_messages(Some(SupportStatus::Read), 10).unwrap().len(), 2);
    }

    #[test]
    fn replies_are_kept_per_user() {
        let db = Database::open_in_memory().unwrap();
        let id = db.record_admin_reply(UserHandle(7), "We are on it").unwrap();
        db.record_admin_reply(UserHandle(8), "Thanks").unwrap();

        let replies = db.get_admin_replies(UserHandle(7)).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id, id);
        assert_eq!(replies[0].message, "We are on it");
    }
}
