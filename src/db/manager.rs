//! Connection lifecycle manager.
//!
//! Owns the single shared handle and guarantees that open + schema init +
//! migrations happen exactly once even when many callers race on first use.
//! The guard is a real mutex, not ad-hoc flags: the first caller through the
//! lock initializes, everyone else re-checks health under the same lock and
//! reuses the handle. The guard is released on every exit path (MutexGuard
//! drop), including failures, so no caller can deadlock on a failed
//! initializer.

use crate::db::migrate::{self, MigrationReport};
use crate::db::{handle, schema};
use crate::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct StoreManager {
    state: Mutex<ManagerState>,
}

struct ManagerState {
    path: PathBuf,
    conn: Option<Connection>,
    schema_ready: bool,
    disabled: bool,
    init_count: u64,
}

impl StoreManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                path: path.into(),
                conn: None,
                schema_ready: false,
                disabled: false,
                init_count: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManagerState> {
        // a panicked holder poisons the mutex; the state itself is still
        // consistent (health is re-checked on every use), so recover
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` against the shared, schema-ready handle, initializing it first
    /// if needed.
    pub fn with_conn<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> AppResult<T>,
    {
        let mut state = self.lock();
        if state.disabled {
            return Err(AppError::ConnectionDisabled);
        }
        ensure_ready(&mut state)?;

        let conn = state
            .conn
            .as_mut()
            .ok_or_else(|| AppError::Connection("store handle unavailable".to_string()))?;
        f(conn)
    }

    /// Point the manager at a different store file. Takes effect on next use.
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.lock();
        if state.path != path {
            state.conn = None;
            state.schema_ready = false;
            state.path = path;
        }
    }

    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Probe the current handle. A dead or missing handle is nulled so the
    /// next call transparently reopens; reports whether a healthy handle is
    /// currently open.
    pub fn health_check(&self) -> bool {
        let mut state = self.lock();
        match state.conn.as_ref() {
            Some(conn) if is_healthy(conn) => true,
            Some(_) => {
                state.conn = None;
                state.schema_ready = false;
                false
            }
            None => false,
        }
    }

    /// Idempotent shutdown: drops the handle and resets the init state.
    pub fn close(&self) {
        let mut state = self.lock();
        state.conn = None;
        state.schema_ready = false;
    }

    /// Test-only failure injection: close and refuse further access with a
    /// typed error until `reenable` is called.
    pub fn close_for_tests(&self) {
        let mut state = self.lock();
        state.conn = None;
        state.schema_ready = false;
        state.disabled = true;
    }

    pub fn reenable(&self) {
        self.lock().disabled = false;
    }

    /// Number of open + schema-init sequences performed so far.
    pub fn init_count(&self) -> u64 {
        self.lock().init_count
    }

    /// Idempotent schema ensure against the shared handle.
    pub fn ensure_schema(&self) -> AppResult<()> {
        self.with_conn(|conn| schema::ensure_schema(conn))
    }

    /// Run pending migrations against the shared handle.
    pub fn run_migrations(&self) -> AppResult<MigrationReport> {
        let mut state = self.lock();
        if state.disabled {
            return Err(AppError::ConnectionDisabled);
        }
        ensure_ready(&mut state)?;
        let path = state.path.clone();
        let conn = state
            .conn
            .as_mut()
            .ok_or_else(|| AppError::Connection("store handle unavailable".to_string()))?;
        migrate::run_migrations(conn, &path)
    }

    /// Destructive rebuild: drop every table, recreate the schema and reseed
    /// the reference data. Admin gating happens in the caller layer.
    pub fn rebuild_store(&self) -> AppResult<MigrationReport> {
        let mut state = self.lock();
        if state.disabled {
            return Err(AppError::ConnectionDisabled);
        }
        ensure_ready(&mut state)?;
        let path = state.path.clone();
        let conn = state
            .conn
            .as_mut()
            .ok_or_else(|| AppError::Connection("store handle unavailable".to_string()))?;

        drop_all_tables(conn)?;
        schema::ensure_schema(conn)?;
        migrate::run_migrations(conn, &path)
    }
}

/// Double-checked init under the caller's lock: reuse a healthy handle,
/// transparently reopen a stale one, initialize from scratch otherwise.
fn ensure_ready(state: &mut ManagerState) -> AppResult<()> {
    if let Some(conn) = state.conn.as_ref() {
        if state.schema_ready && is_healthy(conn) {
            return Ok(());
        }
        state.conn = None;
        state.schema_ready = false;
    }

    let mut conn = handle::open_store(&state.path)?;
    schema::ensure_schema(&conn)?;
    migrate::run_migrations(&mut conn, &state.path)?;

    state.init_count += 1;
    state.schema_ready = true;
    state.conn = Some(conn);
    Ok(())
}

fn is_healthy(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .is_ok()
}

fn drop_all_tables(conn: &Connection) -> AppResult<()> {
    let tables: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        out
    };

    conn.execute_batch("PRAGMA foreign_keys=OFF")?;
    for table in &tables {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\""))?;
    }
    conn.execute_batch("PRAGMA foreign_keys=ON")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate::SCHEMA_VERSION;
    use crate::db::queries;
    use crate::models::entry::Entry;

    fn temp_store(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{name}_timevault_mgr.sqlite"));
        std::fs::remove_file(&path).ok();
        path
    }

    #[test]
    fn first_use_initializes_once() {
        let manager = StoreManager::new(temp_store("first_use"));
        assert_eq!(manager.init_count(), 0);

        manager
            .with_conn(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))?;
                assert_eq!(count, 0);
                Ok(())
            })
            .unwrap();
        manager.with_conn(|_| Ok(())).unwrap();
        assert_eq!(manager.init_count(), 1);
    }

    #[test]
    fn close_then_reuse_reopens() {
        let manager = StoreManager::new(temp_store("close_reuse"));
        manager.with_conn(|_| Ok(())).unwrap();
        manager.close();
        manager.close(); // idempotent
        assert!(!manager.health_check());

        manager.with_conn(|_| Ok(())).unwrap();
        assert!(manager.health_check());
        assert_eq!(manager.init_count(), 2);
    }

    #[test]
    fn disabled_manager_fails_fast() {
        let manager = StoreManager::new(temp_store("disabled"));
        manager.with_conn(|_| Ok(())).unwrap();

        manager.close_for_tests();
        assert!(matches!(
            manager.with_conn(|_| Ok(())),
            Err(AppError::ConnectionDisabled)
        ));
        assert!(matches!(
            manager.run_migrations(),
            Err(AppError::ConnectionDisabled)
        ));

        manager.reenable();
        manager.with_conn(|_| Ok(())).unwrap();
    }

    #[test]
    fn set_path_switches_store_on_next_use() {
        let first = temp_store("switch_a");
        let second = temp_store("switch_b");
        let manager = StoreManager::new(first.clone());

        manager
            .with_conn(|conn| {
                queries::insert_draft(
                    conn,
                    &Entry::draft(None, 8.0, None, None, None, Some("only in A".into())),
                )?;
                Ok(())
            })
            .unwrap();

        manager.set_path(second.clone());
        let pending = manager
            .with_conn(|conn| queries::load_pending(conn))
            .unwrap();
        assert!(pending.is_empty());

        // same path again is a no-op: handle survives
        let before = manager.init_count();
        manager.set_path(second);
        manager.with_conn(|_| Ok(())).unwrap();
        assert_eq!(manager.init_count(), before);
    }

    #[test]
    fn rebuild_resets_to_fresh_target_version() {
        let manager = StoreManager::new(temp_store("rebuild"));
        manager
            .with_conn(|conn| {
                queries::insert_draft(
                    conn,
                    &Entry::draft(None, 8.0, None, None, None, Some("doomed".into())),
                )?;
                Ok(())
            })
            .unwrap();

        let report = manager.rebuild_store().unwrap();
        assert!(report.success);
        assert_eq!(report.to_version, SCHEMA_VERSION);

        let pending = manager
            .with_conn(|conn| queries::load_pending(conn))
            .unwrap();
        assert!(pending.is_empty());
        // reference data reseeded
        let projects: i64 = manager
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))?)
            })
            .unwrap();
        assert!(projects > 0);
    }
}
