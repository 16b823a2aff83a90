//! Fixed, parameterized statements for entries, credentials and sessions.

use crate::errors::{AppError, AppResult};
use crate::models::credential::{Credential, CredentialInfo};
use crate::models::entry::{Entry, valid_hours};
use crate::models::session::Session;
use crate::models::status::EntryStatus;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

pub fn map_entry(row: &Row) -> rusqlite::Result<Entry> {
    let date: Option<String> = row.get("date")?;
    let date = match date {
        Some(s) => Some(NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(AppError::InvalidDate(s)),
            )
        })?),
        None => None,
    };

    let status_str: Option<String> = row.get("status")?;
    let status = EntryStatus::from_db_str(status_str.as_deref()).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(AppError::InvalidStatus(status_str.unwrap_or_default())),
        )
    })?;

    Ok(Entry {
        id: row.get("id")?,
        date,
        hours: row.get("hours")?,
        project: row.get("project")?,
        tool: row.get("tool")?,
        charge_code: row.get("charge_code")?,
        description: row.get("description")?,
        status,
        started_at: row.get("started_at")?,
        submitted_at: row.get("submitted_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Insert a new draft (Pending). Returns the new row id.
pub fn insert_draft(conn: &Connection, entry: &Entry) -> AppResult<i64> {
    if !valid_hours(entry.hours) {
        return Err(AppError::InvalidDuration(entry.hours));
    }

    conn.execute(
        "INSERT INTO entries (date, hours, project, tool, charge_code, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.date_str(),
            entry.hours,
            entry.project,
            entry.tool,
            entry.charge_code,
            entry.description,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Partial draft update. Callers chain only the fields they want to change;
/// column names come from the fixed method set and every value is bound as a
/// parameter.
#[derive(Debug, Default)]
pub struct DraftPatch {
    sets: Vec<(&'static str, Value)>,
}

impl DraftPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date(mut self, date: Option<NaiveDate>) -> Self {
        let value = match date {
            Some(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
            None => Value::Null,
        };
        self.sets.push(("date", value));
        self
    }

    pub fn hours(mut self, hours: f64) -> Self {
        self.sets.push(("hours", Value::Real(hours)));
        self
    }

    pub fn project(mut self, project: Option<String>) -> Self {
        self.sets.push(("project", text_or_null(project)));
        self
    }

    pub fn tool(mut self, tool: Option<String>) -> Self {
        self.sets.push(("tool", text_or_null(tool)));
        self
    }

    pub fn charge_code(mut self, code: Option<String>) -> Self {
        self.sets.push(("charge_code", text_or_null(code)));
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.sets.push(("description", text_or_null(description)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Apply the patch to one Pending entry. Returns the affected row count
    /// (0 when the entry is missing or no longer Pending).
    pub fn apply(self, conn: &Connection, id: i64) -> AppResult<usize> {
        if self.sets.is_empty() {
            return Ok(0);
        }

        for (column, value) in &self.sets {
            if *column == "hours"
                && let Value::Real(h) = value
                && !valid_hours(*h)
            {
                return Err(AppError::InvalidDuration(*h));
            }
        }

        let clauses: Vec<String> = self
            .sets
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE entries SET {}, updated_at = datetime('now')
             WHERE id = ?{} AND status IS NULL",
            clauses.join(", "),
            self.sets.len() + 1
        );

        let mut values: Vec<Value> = self.sets.into_iter().map(|(_, v)| v).collect();
        values.push(Value::Integer(id));

        let changed = conn.execute(&sql, params_from_iter(values))?;
        Ok(changed)
    }
}

fn text_or_null(value: Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s),
        None => Value::Null,
    }
}

/// Delete a draft. Only Pending entries may be removed.
pub fn delete_draft(conn: &Connection, id: i64) -> AppResult<usize> {
    let changed = conn.execute(
        "DELETE FROM entries WHERE id = ?1 AND status IS NULL",
        [id],
    )?;
    Ok(changed)
}

pub fn load_pending(conn: &Connection) -> AppResult<Vec<Entry>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM entries WHERE status IS NULL ORDER BY date ASC, id ASC",
    )?;
    let rows = stmt.query_map([], map_entry)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Archive view: Complete entries with their submission timestamps.
pub fn load_archive(conn: &Connection) -> AppResult<Vec<Entry>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM entries WHERE status = 'Complete'
         ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt.query_map([], map_entry)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_entry(conn: &Connection, id: i64) -> AppResult<Option<Entry>> {
    let entry = conn
        .query_row("SELECT * FROM entries WHERE id = ?1", [id], map_entry)
        .optional()?;
    Ok(entry)
}

// ---------------------------------------------------------------------------
// Credentials (opaque secrets; encryption happens outside this store)
// ---------------------------------------------------------------------------

pub fn upsert_credential(
    conn: &Connection,
    service: &str,
    username: &str,
    secret: &str,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO credentials (service, username, secret)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(service) DO UPDATE SET
             username = excluded.username,
             secret = excluded.secret,
             updated_at = datetime('now')",
        params![service, username, secret],
    )?;
    Ok(())
}

pub fn get_credential(conn: &Connection, service: &str) -> AppResult<Option<Credential>> {
    let credential = conn
        .query_row(
            "SELECT id, service, username, secret, created_at, updated_at
             FROM credentials WHERE service = ?1",
            [service],
            |row| {
                Ok(Credential {
                    id: row.get(0)?,
                    service: row.get(1)?,
                    username: row.get(2)?,
                    secret: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(credential)
}

/// Secret-free listing for UI display.
pub fn list_credentials(conn: &Connection) -> AppResult<Vec<CredentialInfo>> {
    let mut stmt = conn.prepare(
        "SELECT id, service, username, created_at, updated_at
         FROM credentials ORDER BY service ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(CredentialInfo {
            id: row.get(0)?,
            service: row.get(1)?,
            username: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn delete_credential(conn: &Connection, service: &str) -> AppResult<usize> {
    let changed = conn.execute("DELETE FROM credentials WHERE service = ?1", [service])?;
    Ok(changed)
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub fn insert_session(
    conn: &Connection,
    token: &str,
    username: &str,
    is_admin: bool,
    expires_at: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO sessions (token, username, is_admin, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![token, username, is_admin as i64, expires_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up a session by token, ignoring expired ones.
pub fn find_valid_session(conn: &Connection, token: &str) -> AppResult<Option<Session>> {
    let session = conn
        .query_row(
            "SELECT id, token, username, is_admin, created_at, expires_at
             FROM sessions
             WHERE token = ?1 AND datetime(expires_at) > datetime('now')",
            [token],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    token: row.get(1)?,
                    username: row.get(2)?,
                    is_admin: row.get::<_, i64>(3)? != 0,
                    created_at: row.get(4)?,
                    expires_at: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(session)
}

pub fn delete_session(conn: &Connection, token: &str) -> AppResult<usize> {
    let changed = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
    Ok(changed)
}

pub fn purge_expired_sessions(conn: &Connection) -> AppResult<usize> {
    let changed = conn.execute(
        "DELETE FROM sessions WHERE datetime(expires_at) <= datetime('now')",
        [],
    )?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handle::open_in_memory;
    use crate::db::schema::ensure_schema;

    fn store() -> Connection {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn
    }

    fn sample_draft(description: &str) -> Entry {
        Entry::draft(
            NaiveDate::from_ymd_opt(2025, 3, 3),
            8.0,
            Some("Research".to_string()),
            None,
            None,
            Some(description.to_string()),
        )
    }

    #[test]
    fn draft_roundtrip() {
        let conn = store();
        let id = insert_draft(&conn, &sample_draft("write report")).unwrap();

        let entry = get_entry(&conn, id).unwrap().unwrap();
        assert_eq!(entry.hours, 8.0);
        assert_eq!(entry.project.as_deref(), Some("Research"));
        assert!(entry.status.is_pending());
        assert!(entry.submitted_at.is_none());

        assert_eq!(load_pending(&conn).unwrap().len(), 1);
        assert!(load_archive(&conn).unwrap().is_empty());
    }

    #[test]
    fn claimed_entry_surfaces_claim_age() {
        let mut conn = store();
        let id = insert_draft(&conn, &sample_draft("claimed")).unwrap();

        assert!(get_entry(&conn, id).unwrap().unwrap().started_at.is_none());

        crate::db::status::mark_in_progress(&conn, &[id]).unwrap();
        let claimed = get_entry(&conn, id).unwrap().unwrap();
        assert!(claimed.started_at.is_some());

        // reverting the claim clears the timestamp again
        crate::db::status::revert_failed(&mut conn, &[id]).unwrap();
        assert!(get_entry(&conn, id).unwrap().unwrap().started_at.is_none());
    }

    #[test]
    fn insert_rejects_bad_hours_before_hitting_store() {
        let conn = store();
        let mut draft = sample_draft("bad hours");
        draft.hours = 8.3;
        assert!(matches!(
            insert_draft(&conn, &draft),
            Err(AppError::InvalidDuration(_))
        ));
    }

    #[test]
    fn patch_updates_only_named_fields() {
        let conn = store();
        let id = insert_draft(&conn, &sample_draft("original")).unwrap();

        let changed = DraftPatch::new()
            .hours(4.25)
            .tool(Some("Workbench".to_string()))
            .apply(&conn, id)
            .unwrap();
        assert_eq!(changed, 1);

        let entry = get_entry(&conn, id).unwrap().unwrap();
        assert_eq!(entry.hours, 4.25);
        assert_eq!(entry.tool.as_deref(), Some("Workbench"));
        assert_eq!(entry.description.as_deref(), Some("original"));
    }

    #[test]
    fn patch_can_null_draft_fields() {
        let conn = store();
        let id = insert_draft(&conn, &sample_draft("to clear")).unwrap();

        DraftPatch::new().project(None).apply(&conn, id).unwrap();
        let entry = get_entry(&conn, id).unwrap().unwrap();
        assert!(entry.project.is_none());
    }

    #[test]
    fn patch_validates_hours() {
        let conn = store();
        let id = insert_draft(&conn, &sample_draft("x")).unwrap();
        assert!(matches!(
            DraftPatch::new().hours(0.0).apply(&conn, id),
            Err(AppError::InvalidDuration(_))
        ));
    }

    #[test]
    fn patch_skips_non_pending_entries() {
        let mut conn = store();
        let id = insert_draft(&conn, &sample_draft("submitted")).unwrap();
        crate::db::status::mark_submitted(&mut conn, &[id]).unwrap();

        let changed = DraftPatch::new().hours(1.0).apply(&conn, id).unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn delete_only_while_pending() {
        let mut conn = store();
        let id = insert_draft(&conn, &sample_draft("keep me")).unwrap();
        crate::db::status::mark_submitted(&mut conn, &[id]).unwrap();
        assert_eq!(delete_draft(&conn, id).unwrap(), 0);

        let id2 = insert_draft(&conn, &sample_draft("drop me")).unwrap();
        assert_eq!(delete_draft(&conn, id2).unwrap(), 1);
    }

    #[test]
    fn credential_upsert_is_unique_per_service() {
        let conn = store();
        upsert_credential(&conn, "portal", "sam", "cipher-1").unwrap();
        upsert_credential(&conn, "portal", "sam", "cipher-2").unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM credentials", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let cred = get_credential(&conn, "portal").unwrap().unwrap();
        assert_eq!(cred.secret, "cipher-2");
    }

    #[test]
    fn session_expiry() {
        let conn = store();
        insert_session(&conn, "fresh", "sam", false, "2099-01-01 00:00:00").unwrap();
        insert_session(&conn, "stale", "sam", true, "2000-01-01 00:00:00").unwrap();

        assert!(find_valid_session(&conn, "fresh").unwrap().is_some());
        assert!(find_valid_session(&conn, "stale").unwrap().is_none());

        assert_eq!(purge_expired_sessions(&conn).unwrap(), 1);
        assert_eq!(delete_session(&conn, "fresh").unwrap(), 1);
    }
}
