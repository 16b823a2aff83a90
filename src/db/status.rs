//! Entry status state machine.
//!
//! Pending (NULL) → InProgress ('Submitting') → Complete ('Complete'), with
//! InProgress → Pending as the failure revert. Complete is terminal except
//! via a full rebuild. The two externally confirmed transitions
//! (`mark_submitted`, `revert_failed`) validate the exact affected row count
//! and roll back the whole batch on any mismatch: a silent partial update
//! must never report success.

use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, params_from_iter};
use std::collections::BTreeSet;

/// Wall-clock age after which an InProgress row with no progress is
/// considered abandoned by `revert_stale_in_progress`.
const STALE_IN_PROGRESS_MINUTES: i64 = 30;

/// Deduplicate the requested ids; the exact-count validation compares
/// against the distinct count.
fn distinct_ids(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Claim Pending rows for submission. Best-effort: claiming is advisory, so
/// no count validation. Returns the number of rows claimed.
pub fn mark_in_progress(conn: &Connection, ids: &[i64]) -> AppResult<usize> {
    let ids = distinct_ids(ids);
    if ids.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "UPDATE entries
         SET status = 'Submitting',
             started_at = datetime('now'),
             updated_at = datetime('now')
         WHERE id IN ({}) AND status IS NULL",
        placeholders(ids.len())
    );
    let changed = conn.execute(&sql, params_from_iter(ids.iter()))?;
    Ok(changed)
}

/// Mark the given entries Complete with a submission timestamp, in one
/// transaction. All-or-nothing: if the affected row count differs from the
/// requested id count the whole batch rolls back and a consistency error is
/// raised.
pub fn mark_submitted(conn: &mut Connection, ids: &[i64]) -> AppResult<usize> {
    let ids = distinct_ids(ids);
    if ids.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let sql = format!(
        "UPDATE entries
         SET status = 'Complete',
             submitted_at = datetime('now'),
             started_at = NULL,
             updated_at = datetime('now')
         WHERE id IN ({})
           AND (status IS NULL OR status = 'Submitting')",
        placeholders(ids.len())
    );
    let changed = tx.execute(&sql, params_from_iter(ids.iter()))?;

    if changed != ids.len() {
        // rollback on drop
        return Err(AppError::Consistency {
            expected: ids.len(),
            actual: changed,
        });
    }

    tx.commit()?;
    Ok(changed)
}

/// Revert failed InProgress entries back to Pending, with the same
/// exact-count validation as `mark_submitted`.
pub fn revert_failed(conn: &mut Connection, ids: &[i64]) -> AppResult<usize> {
    let ids = distinct_ids(ids);
    if ids.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let sql = format!(
        "UPDATE entries
         SET status = NULL,
             started_at = NULL,
             updated_at = datetime('now')
         WHERE id IN ({}) AND status = 'Submitting'",
        placeholders(ids.len())
    );
    let changed = tx.execute(&sql, params_from_iter(ids.iter()))?;

    if changed != ids.len() {
        return Err(AppError::Consistency {
            expected: ids.len(),
            actual: changed,
        });
    }

    tx.commit()?;
    Ok(changed)
}

/// Crash-recovery sweep: every InProgress row goes back to Pending.
/// Inherently best-effort, no count validation. Run at startup.
pub fn reset_all_in_progress(conn: &Connection) -> AppResult<usize> {
    let changed = conn.execute(
        "UPDATE entries
         SET status = NULL,
             started_at = NULL,
             updated_at = datetime('now')
         WHERE status = 'Submitting'",
        [],
    )?;
    Ok(changed)
}

/// Revert only InProgress rows whose claim is older than the fixed
/// no-progress timeout. Best-effort, used while the host keeps running.
pub fn revert_stale_in_progress(conn: &Connection) -> AppResult<usize> {
    let changed = conn.execute(
        "UPDATE entries
         SET status = NULL,
             started_at = NULL,
             updated_at = datetime('now')
         WHERE status = 'Submitting'
           AND datetime(started_at) < datetime('now', ?1)",
        [format!("-{STALE_IN_PROGRESS_MINUTES} minutes")],
    )?;
    Ok(changed)
}
