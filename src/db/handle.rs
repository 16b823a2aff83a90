//! Storage handle: opens and configures the physical store file.

use crate::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// Bounded page cache, negative value = KiB (PRAGMA cache_size semantics).
const CACHE_SIZE_KIB: i64 = -8192;

/// Open the store file and apply the durability configuration.
///
/// Write-ahead-log journaling with synchronous=NORMAL: relaxed but not
/// disabled. Every multi-row mutation runs in an explicit transaction at a
/// higher layer, so this is safe against torn batches.
pub fn open_store(path: &Path) -> AppResult<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        // create_dir_all is a no-op when the directory exists, which also
        // absorbs creation races between concurrent first callers
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Connection(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let conn = Connection::open(path)
        .map_err(|e| AppError::Connection(format!("cannot open {}: {e}", path.display())))?;

    configure(&conn)?;
    Ok(conn)
}

/// Open an in-memory store (tests and throwaway handles).
pub fn open_in_memory() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| AppError::Connection(format!("cannot open in-memory store: {e}")))?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> AppResult<()> {
    // journal_mode returns the resulting mode as a row, so query it
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| AppError::Connection(format!("cannot set journal mode: {e}")))?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|e| AppError::Connection(format!("cannot set synchronous mode: {e}")))?;
    conn.pragma_update(None, "cache_size", CACHE_SIZE_KIB)
        .map_err(|e| AppError::Connection(format!("cannot set cache size: {e}")))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| AppError::Connection(format!("cannot enable foreign keys: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_missing_directory() {
        let dir = std::env::temp_dir().join("timevault_handle_test_dir");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("nested").join("store.sqlite");

        let conn = open_store(&path).unwrap();
        assert!(path.parent().unwrap().exists());

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        drop(conn);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn in_memory_store_is_configured() {
        let conn = open_in_memory().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
