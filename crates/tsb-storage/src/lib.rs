//! SQLite implementation of the storage port.
//!
//! # Schema
//!
//! `users`: `user_uid` (pk), `first_name`, `last_name`, `department`,
//! `priority`.
//!
//! `tickets`: `id` (pk, autoincrement), `user_uid` (fk → users), `title`,
//! `description`, `status`, `update_reason` (nullable), `created_at`,
//! `last_updated` (RFC 3339 UTC).
//!
//! `blocked_users`: `user_uid` (pk), `reason`.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use tsb_core::{
    domain::{BlockedUser, NewTicket, Ticket, TicketId, TicketStatus, User, UserId},
    ports::{Storage, TicketFilter},
    Error, Result,
};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    /// Fresh store on an in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                user_uid INTEGER PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                department TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_uid INTEGER NOT NULL REFERENCES users(user_uid),
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL,
                update_reason TEXT,
                created_at TEXT NOT NULL,
                last_updated TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tickets_user_uid ON tickets(user_uid)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocked_users (
                user_uid INTEGER PRIMARY KEY,
                reason TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("connection lock poisoned".to_string()))
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("bad timestamp {raw:?}: {e}")))
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<(Ticket, String, String)> {
    // Timestamps come back raw; the caller parses them so a malformed row
    // surfaces as a storage error instead of a panic.
    let status_raw: String = row.get(4)?;
    let status = status_raw.parse::<TicketStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;
    Ok((
        Ticket {
            id: TicketId(row.get(0)?),
            user_uid: UserId(row.get(1)?),
            title: row.get(2)?,
            description: row.get(3)?,
            status,
            update_reason: row.get(5)?,
            created_at: Utc::now(),
            last_updated: Utc::now(),
        },
        row.get(6)?,
        row.get(7)?,
    ))
}

fn finish_ticket(parts: (Ticket, String, String)) -> Result<Ticket> {
    let (mut ticket, created_at, last_updated) = parts;
    ticket.created_at = parse_timestamp(&created_at)?;
    ticket.last_updated = parse_timestamp(&last_updated)?;
    Ok(ticket)
}

const TICKET_COLUMNS: &str =
    "id, user_uid, title, description, status, update_reason, created_at, last_updated";

impl Storage for SqliteStore {
    fn user_by_uid(&self, uid: UserId) -> Result<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT user_uid, first_name, last_name, department, priority
             FROM users WHERE user_uid = ?1",
            params![uid.0],
            |row| {
                Ok(User {
                    user_uid: UserId(row.get(0)?),
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    department: row.get(3)?,
                    priority: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    fn add_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (user_uid, first_name, last_name, department, priority)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.user_uid.0,
                user.first_name,
                user.last_name,
                user.department,
                user.priority
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn is_blocked(&self, uid: UserId) -> Result<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT user_uid FROM blocked_users WHERE user_uid = ?1",
                params![uid.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn add_blocked_user(&self, uid: UserId, reason: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO blocked_users (user_uid, reason) VALUES (?1, ?2)",
            params![uid.0, reason],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn remove_blocked_user(&self, uid: UserId) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM blocked_users WHERE user_uid = ?1",
            params![uid.0],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn blocked_users(&self) -> Result<Vec<BlockedUser>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT user_uid, reason FROM blocked_users ORDER BY user_uid")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BlockedUser {
                    user_uid: UserId(row.get(0)?),
                    reason: row.get(1)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn add_ticket(&self, ticket: &NewTicket, now: DateTime<Utc>) -> Result<Ticket> {
        let conn = self.lock()?;
        let now_raw = now.to_rfc3339();
        conn.execute(
            "INSERT INTO tickets (user_uid, title, description, status, created_at, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ticket.user_uid.0,
                ticket.title,
                ticket.description,
                TicketStatus::New.as_str(),
                now_raw,
                now_raw
            ],
        )
        .map_err(db_err)?;

        Ok(Ticket {
            id: TicketId(conn.last_insert_rowid()),
            user_uid: ticket.user_uid,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            status: TicketStatus::New,
            update_reason: None,
            created_at: now,
            last_updated: now,
        })
    }

    fn ticket_by_id(&self, id: TicketId) -> Result<Option<Ticket>> {
        let conn = self.lock()?;
        let parts = conn
            .query_row(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
                params![id.0],
                ticket_from_row,
            )
            .optional()
            .map_err(db_err)?;
        parts.map(finish_ticket).transpose()
    }

    fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>> {
        let conn = self.lock()?;
        let (sql, param): (String, Option<rusqlite::types::Value>) = match filter {
            TicketFilter::All => (
                format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY id"),
                None,
            ),
            TicketFilter::Owner(uid) => (
                format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE user_uid = ?1 ORDER BY id"),
                Some(uid.0.into()),
            ),
            TicketFilter::Status(status) => (
                format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE status = ?1 ORDER BY id"),
                Some(status.as_str().to_string().into()),
            ),
        };

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = match param {
            Some(value) => stmt.query_map(params![value], ticket_from_row),
            None => stmt.query_map([], ticket_from_row),
        }
        .map_err(db_err)?;

        let parts = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?;
        parts.into_iter().map(finish_ticket).collect()
    }

    fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE tickets SET status = ?1, update_reason = ?2, last_updated = ?3
                 WHERE id = ?4",
                params![status.as_str(), reason, now.to_rfc3339(), id.0],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(Error::TicketNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn user(uid: i64) -> User {
        User {
            user_uid: UserId(uid),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            department: "Dev".to_string(),
            priority: 0,
        }
    }

    fn new_ticket(uid: i64, title: &str) -> NewTicket {
        NewTicket {
            user_uid: UserId(uid),
            title: title.to_string(),
            description: "details".to_string(),
        }
    }

    #[test]
    fn user_round_trip_and_uniqueness() {
        let store = store();
        assert_eq!(store.user_by_uid(UserId(1)).unwrap(), None);

        store.add_user(&user(1)).unwrap();
        assert_eq!(store.user_by_uid(UserId(1)).unwrap(), Some(user(1)));

        // user_uid is the primary key; a duplicate insert fails.
        assert!(store.add_user(&user(1)).is_err());
    }

    #[test]
    fn blocked_users_add_remove_list() {
        let store = store();
        assert!(!store.is_blocked(UserId(5)).unwrap());

        store.add_blocked_user(UserId(5), "nouser").unwrap();
        store.add_blocked_user(UserId(6), "Added by admin.").unwrap();
        assert!(store.is_blocked(UserId(5)).unwrap());

        let blocked = store.blocked_users().unwrap();
        assert_eq!(
            blocked.iter().map(|b| b.user_uid.0).collect::<Vec<_>>(),
            vec![5, 6]
        );

        store.remove_blocked_user(UserId(5)).unwrap();
        assert!(!store.is_blocked(UserId(5)).unwrap());
        // Removing an absent row is not an error.
        store.remove_blocked_user(UserId(5)).unwrap();
    }

    #[test]
    fn tickets_get_sequential_ids_and_list_in_creation_order() {
        let store = store();
        store.add_user(&user(1)).unwrap();
        store.add_user(&user(2)).unwrap();

        let now = Utc::now();
        let t1 = store.add_ticket(&new_ticket(1, "first"), now).unwrap();
        let t2 = store.add_ticket(&new_ticket(2, "second"), now).unwrap();
        let t3 = store.add_ticket(&new_ticket(1, "third"), now).unwrap();
        assert_eq!((t1.id.0, t2.id.0, t3.id.0), (1, 2, 3));
        assert_eq!(t1.status, TicketStatus::New);

        let all = store.list_tickets(TicketFilter::All).unwrap();
        assert_eq!(
            all.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );

        let mine = store
            .list_tickets(TicketFilter::Owner(UserId(1)))
            .unwrap();
        assert_eq!(
            mine.iter().map(|t| t.id.0).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn status_update_stamps_reason_and_time() {
        let store = store();
        store.add_user(&user(1)).unwrap();
        let created = Utc::now();
        let ticket = store.add_ticket(&new_ticket(1, "t"), created).unwrap();

        let later = created + chrono::Duration::seconds(30);
        store
            .update_ticket_status(ticket.id, TicketStatus::InWork, None, later)
            .unwrap();
        let stored = store.ticket_by_id(ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::InWork);
        assert_eq!(stored.update_reason, None);
        assert_eq!(stored.last_updated, later);

        let done = later + chrono::Duration::seconds(30);
        store
            .update_ticket_status(
                ticket.id,
                TicketStatus::Completed,
                Some("Ticket completed by requester."),
                done,
            )
            .unwrap();
        let stored = store.ticket_by_id(ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Completed);
        assert_eq!(
            stored.update_reason.as_deref(),
            Some("Ticket completed by requester.")
        );

        let by_status = store
            .list_tickets(TicketFilter::Status(TicketStatus::Completed))
            .unwrap();
        assert_eq!(by_status.len(), 1);
    }

    #[test]
    fn updating_unknown_ticket_is_not_found() {
        let store = store();
        let err = store
            .update_ticket_status(TicketId(9), TicketStatus::Rejected, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::TicketNotFound(TicketId(9))));
    }
}
