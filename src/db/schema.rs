//! Schema definition and integrity guard.
//!
//! `ensure_schema` declares the full current shape (idempotent) and runs the
//! generated-column repair on every call, independent of what the version
//! record claims: the on-disk structure may not match the bookkeeping.

use crate::errors::{AppError, AppResult};
use crate::ui::messages::{success, warning};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use std::sync::OnceLock;

/// Column list of the modern entries table, used by the shadow rebuild.
const ENTRY_COLUMNS: &[&str] = &[
    "id",
    "date",
    "hours",
    "project",
    "tool",
    "charge_code",
    "description",
    "status",
    "started_at",
    "submitted_at",
    "created_at",
    "updated_at",
];

/// Body of the entries table. `hours` is a plain stored REAL: the CHECK
/// enforces the quarter-hour domain at the storage layer, not just in
/// application code.
const ENTRY_TABLE_BODY: &str = r#"
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    date         TEXT,
    hours        REAL NOT NULL
                 CHECK (hours >= 0.25 AND hours <= 24.0
                        AND hours * 4.0 = CAST(hours * 4.0 AS INTEGER)),
    project      TEXT,
    tool         TEXT,
    charge_code  TEXT,
    description  TEXT,
    status       TEXT CHECK (status IN ('Submitting', 'Complete')),
    started_at   TEXT,
    submitted_at TEXT,
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at   TEXT NOT NULL DEFAULT (datetime('now'))
"#;

/// Ensure every table and index exists with the modern schema.
/// Safe from any entry point and safe to call repeatedly.
pub fn ensure_schema(conn: &Connection) -> AppResult<()> {
    create_core_tables(conn).map_err(|e| AppError::Schema(format!("core tables: {e}")))?;

    // Repair before touching indexes: a rebuild drops and recreates them.
    repair_generated_duration(conn)?;

    create_secondary_indexes(conn)
        .map_err(|e| AppError::Schema(format!("secondary indexes: {e}")))?;
    create_natural_key_index(conn)?;

    create_reference_tables(conn)
        .map_err(|e| AppError::Schema(format!("reference tables: {e}")))?;
    seed_reference_tables(conn)?;

    Ok(())
}

fn create_core_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS entries ({ENTRY_TABLE_BODY});

        CREATE TABLE IF NOT EXISTS credentials (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            service    TEXT NOT NULL UNIQUE,
            username   TEXT NOT NULL,
            secret     TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            token      TEXT NOT NULL UNIQUE,
            username   TEXT NOT NULL,
            is_admin   INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS schema_version (
            id         INTEGER PRIMARY KEY CHECK (id = 1),
            version    INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#
    ))
}

pub(crate) fn create_secondary_indexes(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_entries_status ON entries(status);
        CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date);
        "#,
    )
}

/// Create the natural-key unique index defensively.
///
/// Existing rows are scanned for violations first; if any exist the index is
/// skipped with a warning. Enforcing uniqueness must never prevent startup
/// against messy historical data.
fn create_natural_key_index(conn: &Connection) -> AppResult<()> {
    let dupes: i64 = conn.query_row(
        "SELECT COUNT(*) FROM (
             SELECT 1 FROM entries
             WHERE date IS NOT NULL AND project IS NOT NULL AND description IS NOT NULL
             GROUP BY date, project, description
             HAVING COUNT(*) > 1
         )",
        [],
        |row| row.get(0),
    )?;

    if dupes > 0 {
        warning(format!(
            "Skipping natural-key unique index: {dupes} duplicate (date, project, description) group(s) present"
        ));
        return Ok(());
    }

    conn.execute_batch(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_natural_key
            ON entries(date, project, description)
            WHERE date IS NOT NULL AND project IS NOT NULL AND description IS NOT NULL;
        "#,
    )
    .map_err(|e| AppError::Schema(format!("natural-key index: {e}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

/// Static reference set: selectable projects and tools, plus which tools are
/// valid for which project.
const PROJECT_SEED: &[&str] = &[
    "Client Services",
    "Internal Development",
    "Infrastructure",
    "Research",
    "Training",
];

const TOOL_SEED: &[&str] = &["Workbench", "Fieldkit", "Pipeline", "Helpdesk"];

const PROJECT_TOOL_SEED: &[(&str, &str)] = &[
    ("Client Services", "Helpdesk"),
    ("Client Services", "Fieldkit"),
    ("Internal Development", "Workbench"),
    ("Internal Development", "Pipeline"),
    ("Infrastructure", "Pipeline"),
    ("Research", "Workbench"),
];

pub(crate) fn create_reference_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id     INTEGER PRIMARY KEY AUTOINCREMENT,
            name   TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS tools (
            id     INTEGER PRIMARY KEY AUTOINCREMENT,
            name   TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS project_tools (
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            tool_id    INTEGER NOT NULL REFERENCES tools(id) ON DELETE CASCADE,
            PRIMARY KEY (project_id, tool_id)
        );
        "#,
    )
}

/// Seed the reference tables from the static set. INSERT OR IGNORE keeps the
/// operation idempotent across repeated schema-ensure calls.
pub(crate) fn seed_reference_tables(conn: &Connection) -> AppResult<()> {
    for name in PROJECT_SEED {
        conn.execute("INSERT OR IGNORE INTO projects (name) VALUES (?1)", [name])?;
    }
    for name in TOOL_SEED {
        conn.execute("INSERT OR IGNORE INTO tools (name) VALUES (?1)", [name])?;
    }
    for (project, tool) in PROJECT_TOOL_SEED {
        conn.execute(
            "INSERT OR IGNORE INTO project_tools (project_id, tool_id)
             SELECT p.id, t.id FROM projects p, tools t
             WHERE p.name = ?1 AND t.name = ?2",
            [project, tool],
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Generated-column integrity guard
// ---------------------------------------------------------------------------

/// Detect and repair the legacy defect where `hours` was declared as an
/// engine-computed column instead of a stored value.
pub fn repair_generated_duration(conn: &Connection) -> AppResult<()> {
    if !entries_table_exists(conn)? {
        return Ok(());
    }

    // Three independent checks, short-circuiting: cheapest first.
    let defective = hours_generated_in_sql(conn)?
        || hours_generated_in_metadata(conn)?
        || hours_generated_by_probe(conn)?;

    if !defective {
        return Ok(());
    }

    warning("Detected generated-column defect on entries.hours — rebuilding table...");
    rebuild_entries_table(conn)?;
    success("entries table rebuilt with stored hours column.");
    Ok(())
}

fn entries_table_exists(conn: &Connection) -> AppResult<bool> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='entries'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn generated_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // matches "hours ... GENERATED ALWAYS" or the bare "hours ... AS ("
        // column form within a single column definition
        Regex::new(r"(?is)\bhours\b[^,]*(\bGENERATED\s+ALWAYS\b|\bAS\s*\()")
            .expect("static pattern")
    })
}

/// Check 1: textual scan of the stored table definition.
fn hours_generated_in_sql(conn: &Connection) -> AppResult<bool> {
    let sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type='table' AND name='entries'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(sql.is_some_and(|s| generated_marker().is_match(&s)))
}

/// Check 2: column metadata introspection. table_xinfo reports hidden = 2
/// (virtual) or 3 (stored) for generated columns.
fn hours_generated_in_metadata(conn: &Connection) -> AppResult<bool> {
    let hidden: Option<i64> = conn
        .query_row(
            "SELECT hidden FROM pragma_table_xinfo('entries') WHERE name = 'hours'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(matches!(hidden, Some(2) | Some(3)))
}

/// Check 3: literal insert-then-rollback probe inside a savepoint. Writing an
/// explicit value into a generated column is rejected by the engine.
fn hours_generated_by_probe(conn: &Connection) -> AppResult<bool> {
    conn.execute_batch("SAVEPOINT hours_probe")?;

    let result = conn.execute("INSERT INTO entries (hours) VALUES (8.0)", []);
    let defective = match result {
        Ok(_) => false,
        Err(e) => e.to_string().to_lowercase().contains("generated column"),
    };

    conn.execute_batch("ROLLBACK TO hours_probe; RELEASE hours_probe;")?;
    Ok(defective)
}

/// Shadow-table rebuild: create the corrected table, copy every row, drop the
/// original, rename into place and recreate the secondary indexes.
fn rebuild_entries_table(conn: &Connection) -> AppResult<()> {
    // Columns present in the legacy table; the copy list is the intersection
    // with the modern shape so older defective tables migrate too. table_xinfo
    // (not table_info) so generated columns are listed: the defective `hours`
    // must be in the copy list, its materialized values read fine in SELECT.
    let existing: Vec<String> = {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_xinfo('entries')")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        out
    };

    let copy_list: Vec<&str> = ENTRY_COLUMNS
        .iter()
        .copied()
        .filter(|c| existing.iter().any(|e| e == c))
        .collect();
    let columns = copy_list.join(", ");

    // Savepoint rather than BEGIN: the rebuild must also run when the caller
    // already holds a transaction (a migration step invoking ensure_schema).
    conn.execute_batch("SAVEPOINT entries_rebuild")?;

    let rebuild = conn.execute_batch(&format!(
        r#"
        CREATE TABLE entries_repair ({ENTRY_TABLE_BODY});

        INSERT INTO entries_repair ({columns})
        SELECT {columns} FROM entries;

        DROP TABLE entries;
        ALTER TABLE entries_repair RENAME TO entries;

        UPDATE sqlite_sequence
            SET seq = (SELECT IFNULL(MAX(id), 0) FROM entries)
        WHERE name = 'entries';
        "#
    ));
    if let Err(e) = rebuild {
        conn.execute_batch("ROLLBACK TO entries_rebuild; RELEASE entries_rebuild;")
            .ok();
        return Err(AppError::Schema(format!("entries rebuild failed: {e}")));
    }
    conn.execute_batch("RELEASE entries_rebuild")?;

    create_secondary_indexes(conn)
        .map_err(|e| AppError::Schema(format!("index recreation failed: {e}")))?;
    create_natural_key_index(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handle::open_in_memory;

    fn defective_store() -> Connection {
        let conn = open_in_memory().unwrap();
        // legacy shape: hours derived from a minutes column
        conn.execute_batch(
            r#"
            CREATE TABLE entries (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                date         TEXT,
                minutes      INTEGER NOT NULL DEFAULT 480,
                hours        REAL GENERATED ALWAYS AS (minutes / 60.0) STORED,
                project      TEXT,
                tool         TEXT,
                charge_code  TEXT,
                description  TEXT,
                status       TEXT,
                started_at   TEXT,
                submitted_at TEXT,
                created_at   TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );
            INSERT INTO entries (date, minutes, project, description)
            VALUES ('2025-03-03', 480, 'Research', 'legacy row');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let projects_first: i64 = conn
            .query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))
            .unwrap();
        let tables_first: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |r| r.get(0),
            )
            .unwrap();

        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let projects: i64 = conn
            .query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))
            .unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(projects, projects_first);
        assert_eq!(tables, tables_first);
    }

    #[test]
    fn hours_check_constraint_domain() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        for ok in [0.25, 8.0, 23.75, 24.0] {
            conn.execute("INSERT INTO entries (hours) VALUES (?1)", [ok])
                .unwrap();
        }
        for bad in [0.0, 0.1, 8.3, 24.25, -4.0] {
            assert!(
                conn.execute("INSERT INTO entries (hours) VALUES (?1)", [bad])
                    .is_err(),
                "hours = {bad} should be rejected"
            );
        }
    }

    #[test]
    fn textual_scan_detects_generated_column() {
        let conn = defective_store();
        assert!(hours_generated_in_sql(&conn).unwrap());
    }

    #[test]
    fn metadata_check_detects_generated_column() {
        let conn = defective_store();
        assert!(hours_generated_in_metadata(&conn).unwrap());
    }

    #[test]
    fn probe_detects_generated_column_and_rolls_back() {
        let conn = defective_store();
        assert!(hours_generated_by_probe(&conn).unwrap());
        // the probe must not leave any row behind
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn probe_is_clean_on_healthy_table() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        assert!(!hours_generated_by_probe(&conn).unwrap());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn guard_rebuilds_defective_table() {
        let conn = defective_store();
        ensure_schema(&conn).unwrap();

        // legacy data survives with the computed value materialized
        let hours: f64 = conn
            .query_row(
                "SELECT hours FROM entries WHERE description = 'legacy row'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(hours, 8.0);

        // explicit inserts now succeed
        conn.execute("INSERT INTO entries (hours) VALUES (4.5)", [])
            .unwrap();
        assert!(!hours_generated_in_sql(&conn).unwrap());
        assert!(!hours_generated_in_metadata(&conn).unwrap());
    }

    #[test]
    fn guard_rebuilds_virtual_generated_column() {
        // VIRTUAL variant of the defect: not materialized, still copyable
        let conn = open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE entries (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                date    TEXT,
                minutes INTEGER NOT NULL,
                hours   REAL GENERATED ALWAYS AS (minutes / 60.0) VIRTUAL
            );
            INSERT INTO entries (date, minutes) VALUES
                ('2025-03-03', 480),
                ('2025-03-04', 270);
            "#,
        )
        .unwrap();

        ensure_schema(&conn).unwrap();

        let hours: Vec<f64> = {
            let mut stmt = conn
                .prepare("SELECT hours FROM entries ORDER BY date")
                .unwrap();
            stmt.query_map([], |r| r.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };
        assert_eq!(hours, vec![8.0, 4.5]);
        assert!(!hours_generated_in_metadata(&conn).unwrap());
    }

    #[test]
    fn repair_nests_inside_open_transaction() {
        let conn = defective_store();
        conn.execute_batch("BEGIN").unwrap();
        repair_generated_duration(&conn).unwrap();
        conn.execute_batch("COMMIT").unwrap();

        let hours: f64 = conn
            .query_row(
                "SELECT hours FROM entries WHERE description = 'legacy row'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(hours, 8.0);
        assert!(!hours_generated_in_sql(&conn).unwrap());
    }

    #[test]
    fn natural_key_index_skipped_on_duplicates() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute_batch("DROP INDEX idx_entries_natural_key").unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO entries (date, hours, project, description)
            VALUES ('2025-01-06', 8.0, 'Research', 'dup'),
                   ('2025-01-06', 8.0, 'Research', 'dup');
            "#,
        )
        .unwrap();

        ensure_schema(&conn).unwrap();
        let idx: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_entries_natural_key'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn natural_key_rejects_duplicates_when_clean() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO entries (date, hours, project, description)
             VALUES ('2025-01-06', 8.0, 'Research', 'unique row')",
            [],
        )
        .unwrap();
        assert!(
            conn.execute(
                "INSERT INTO entries (date, hours, project, description)
                 VALUES ('2025-01-06', 4.0, 'Research', 'unique row')",
                [],
            )
            .is_err()
        );
        // partial index: NULL fields never collide
        conn.execute("INSERT INTO entries (hours) VALUES (8.0)", [])
            .unwrap();
        conn.execute("INSERT INTO entries (hours) VALUES (8.0)", [])
            .unwrap();
    }
}
