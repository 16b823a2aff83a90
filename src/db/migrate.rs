//! Versioned migration engine.
//!
//! Brings an existing store from its on-disk version to [`SCHEMA_VERSION`]
//! without data loss. A store that already holds real data (version > 0) is
//! snapshotted before any schema change; a missing snapshot aborts the whole
//! run. Each step runs in its own transaction pairing "apply transform" with
//! "record new version", so a failed step never leaves the version pointer
//! ahead of what was actually applied.

use crate::db::backup::snapshot_store;
use crate::db::schema;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{success, warning};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Target schema version of this build.
pub const SCHEMA_VERSION: i64 = 3;

pub struct MigrationStep {
    pub version: i64,
    pub description: &'static str,
    pub apply: fn(&Connection) -> AppResult<()>,
}

/// Ordered migration history. Steps are guarded (IF NOT EXISTS / OR IGNORE)
/// so a fresh store runs the full list cleanly.
fn steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep {
            version: 1,
            description: "create core tables (entries, credentials, sessions)",
            apply: |conn| schema::ensure_schema(conn),
        },
        MigrationStep {
            version: 2,
            description: "create and seed reference tables (projects, tools)",
            apply: |conn| {
                schema::create_reference_tables(conn)
                    .map_err(|e| AppError::Schema(format!("reference tables: {e}")))?;
                schema::seed_reference_tables(conn)
            },
        },
        MigrationStep {
            version: 3,
            description: "add status and date indexes on entries",
            apply: |conn| {
                schema::create_secondary_indexes(conn)
                    .map_err(|e| AppError::Schema(format!("secondary indexes: {e}")))?;
                Ok(())
            },
        },
    ]
}

/// Outcome of a migration run.
#[derive(Debug, Serialize)]
pub struct MigrationReport {
    pub success: bool,
    pub from_version: i64,
    pub to_version: i64,
    pub steps_run: usize,
    pub backup_path: Option<PathBuf>,
    pub error: Option<String>,
}

/// Read the current on-disk version. A missing table or row means 0.
pub fn current_version(conn: &Connection) -> AppResult<i64> {
    let table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if table.is_none() {
        return Ok(0);
    }

    let version: Option<i64> = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0))
}

/// Write the singleton version row inside the caller's transaction.
fn write_version(conn: &Connection, version: i64) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id         INTEGER PRIMARY KEY CHECK (id = 1),
            version    INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "INSERT INTO schema_version (id, version, updated_at) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET version = excluded.version,
                                       updated_at = excluded.updated_at",
        params![version, Local::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Run all pending migrations. Idempotent: a second run reports zero steps,
/// an unchanged version and no backup.
pub fn run_migrations(conn: &mut Connection, db_path: &Path) -> AppResult<MigrationReport> {
    run_steps(conn, db_path, steps(), SCHEMA_VERSION)
}

fn run_steps(
    conn: &mut Connection,
    db_path: &Path,
    all_steps: Vec<MigrationStep>,
    target: i64,
) -> AppResult<MigrationReport> {
    let from_version = current_version(conn)?;

    if from_version >= target {
        return Ok(MigrationReport {
            success: true,
            from_version,
            to_version: from_version,
            steps_run: 0,
            backup_path: None,
            error: None,
        });
    }

    // Hard safety gate: real data may exist, so back it up before any
    // mutation. A fresh store (version 0) has nothing to lose.
    let backup_path = if from_version > 0 {
        match snapshot_store(conn, db_path) {
            Ok(path) => {
                success(format!("Pre-migration backup: {}", path.display()));
                Some(path)
            }
            Err(e) => {
                return Err(AppError::Migration {
                    message: format!("pre-migration backup failed, aborting: {e}"),
                    last_good_version: from_version,
                    backup_path: None,
                });
            }
        }
    } else {
        None
    };

    let pending: Vec<MigrationStep> = all_steps
        .into_iter()
        .filter(|s| s.version > from_version && s.version <= target)
        .collect();

    let mut applied = from_version;
    let mut steps_run = 0usize;

    for step in &pending {
        let tx = conn.transaction()?;

        let result = (step.apply)(&tx).and_then(|_| write_version(&tx, step.version));
        match result {
            Ok(()) => {
                tx.commit()?;
                applied = step.version;
                steps_run += 1;
                success(format!("Migration {} applied: {}", step.version, step.description));
            }
            Err(e) => {
                // rollback on drop; version pointer stays at the last commit
                drop(tx);
                return Err(AppError::Migration {
                    message: format!(
                        "step {} ({}) failed: {e}",
                        step.version, step.description
                    ),
                    last_good_version: applied,
                    backup_path,
                });
            }
        }
    }

    // No step matched the gap (schema caught up out-of-band): fast-forward
    // the version record without running transforms.
    if applied < target {
        warning(format!(
            "No migration steps between {applied} and {target}; fast-forwarding version record"
        ));
        let tx = conn.transaction()?;
        write_version(&tx, target)?;
        tx.commit()?;
        applied = target;
    }

    Ok(MigrationReport {
        success: true,
        from_version,
        to_version: applied,
        steps_run,
        backup_path,
        error: None,
    })
}
