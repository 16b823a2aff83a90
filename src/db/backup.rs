//! Backup artifacts.
//!
//! `snapshot_store` produces the full-fidelity pre-migration snapshot the
//! migration engine gates on. `archive_store` is the user-facing backup
//! (plain copy of the store plus WAL companions, optionally zipped).

use crate::errors::{AppError, AppResult};
use crate::ui::messages::warning;
use rusqlite::Connection;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::FileOptions;

/// Snapshot the live store into a timestamped sibling file.
///
/// Prefers VACUUM INTO: atomic, and it works straight from the live handle,
/// so a store whose writes are still buffered in the WAL (or that has no
/// on-disk file at all yet) is snapshotted correctly. If that fails, fall
/// back to checkpointing the WAL and replaying the schema and rows manually.
pub fn snapshot_store(conn: &Connection, db_path: &Path) -> AppResult<PathBuf> {
    let dest = snapshot_path(db_path);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    match vacuum_into(conn, &dest) {
        Ok(()) => Ok(dest),
        Err(e) => {
            warning(format!("VACUUM INTO unavailable ({e}); copying store manually"));
            fs::remove_file(&dest).ok();
            manual_copy(conn, &dest)?;
            Ok(dest)
        }
    }
}

fn snapshot_path(db_path: &Path) -> PathBuf {
    let stem = db_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "store".to_string());
    let name = format!(
        "{stem}-pre-migration-{}.sqlite",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );

    match db_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.join(name),
        _ => std::env::temp_dir().join(name),
    }
}

fn vacuum_into(conn: &Connection, dest: &Path) -> rusqlite::Result<()> {
    conn.execute("VACUUM INTO ?1", [dest.to_string_lossy().into_owned()])?;
    Ok(())
}

/// Manual fallback: checkpoint the write-ahead log into the main file, then
/// replay every schema object in dependency order and copy every row into a
/// fresh file inside one transaction. Any error rolls back and removes the
/// partial file.
fn manual_copy(src: &Connection, dest_path: &Path) -> AppResult<()> {
    // fold pending WAL frames into the main database first
    src.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
        .ok();

    let dest = Connection::open(dest_path)
        .map_err(|e| AppError::Connection(format!("cannot open snapshot file: {e}")))?;

    let result = replay_into(src, &dest);
    if let Err(e) = result {
        dest.execute_batch("ROLLBACK").ok();
        drop(dest);
        fs::remove_file(dest_path).ok();
        return Err(e);
    }
    Ok(())
}

fn replay_into(src: &Connection, dest: &Connection) -> AppResult<()> {
    // tables first, then views/indexes/triggers which depend on them
    let objects: Vec<(String, String, String)> = {
        let mut stmt = src.prepare(
            "SELECT type, name, sql FROM sqlite_master
             WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'
             ORDER BY CASE type
                 WHEN 'table' THEN 0
                 WHEN 'view' THEN 1
                 WHEN 'index' THEN 2
                 WHEN 'trigger' THEN 3
                 ELSE 4 END",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        out
    };

    dest.execute_batch("BEGIN")?;

    for (kind, _, sql) in &objects {
        if kind == "table" || kind == "view" || kind == "index" || kind == "trigger" {
            dest.execute_batch(sql)?;
        }
    }

    for (kind, name, _) in &objects {
        if kind != "table" {
            continue;
        }
        copy_table_rows(src, dest, name)?;
    }

    dest.execute_batch("COMMIT")?;
    Ok(())
}

fn copy_table_rows(src: &Connection, dest: &Connection, table: &str) -> AppResult<()> {
    let mut select = src.prepare(&format!("SELECT * FROM \"{table}\""))?;
    let ncols = select.column_count();
    let placeholders = vec!["?"; ncols].join(", ");
    let mut insert = dest.prepare(&format!("INSERT INTO \"{table}\" VALUES ({placeholders})"))?;

    let mut rows = select.query([])?;
    while let Some(row) = rows.next()? {
        let values: Vec<rusqlite::types::Value> = (0..ncols)
            .map(|i| row.get(i))
            .collect::<rusqlite::Result<_>>()?;
        insert.execute(rusqlite::params_from_iter(values))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// User-initiated archive (CLI `backup` command)
// ---------------------------------------------------------------------------

/// Copy the store (and WAL companion files when present) to `dest_file`,
/// optionally compressing everything into a single zip archive.
pub fn archive_store(db_path: &Path, dest_file: &Path, compress: bool) -> AppResult<PathBuf> {
    if !db_path.exists() {
        return Err(AppError::Connection(format!(
            "store not found: {}",
            db_path.display()
        )));
    }

    if let Some(parent) = dest_file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let companions = ["-wal", "-shm"];

    if compress {
        let zip_path = dest_file.with_extension("zip");
        let file = File::create(&zip_path)?;
        let mut zip = ZipWriter::new(file);
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);

        let write_member = |zip: &mut ZipWriter<File>, name: &str, path: &Path| -> AppResult<()> {
            zip.start_file(name, options.clone())
                .map_err(|e| AppError::Other(format!("zip error: {e}")))?;
            zip.write_all(&fs::read(path)?)?;
            Ok(())
        };

        write_member(&mut zip, "store.sqlite", db_path)?;
        for suffix in companions {
            let companion = companion_path(db_path, suffix);
            if companion.exists() {
                write_member(&mut zip, &format!("store.sqlite{suffix}"), &companion)?;
            }
        }

        zip.finish()
            .map_err(|e| AppError::Other(format!("zip error: {e}")))?;
        Ok(zip_path)
    } else {
        fs::copy(db_path, dest_file)?;
        for suffix in companions {
            let companion = companion_path(db_path, suffix);
            if companion.exists() {
                fs::copy(&companion, companion_path(dest_file, suffix))?;
            }
        }
        Ok(dest_file.to_path_buf())
    }
}

fn companion_path(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
