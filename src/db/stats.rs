use crate::db::migrate::current_version;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, RESET, YELLOW};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// Print a short store summary for the `db --info` command.
pub fn print_store_info(conn: &Connection, db_path: &Path) -> AppResult<()> {
    println!();

    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path.display(), RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);
    println!(
        "{}• Schema version:{} {}{}{}",
        CYAN,
        RESET,
        GREEN,
        current_version(conn)?,
        RESET
    );

    let (pending, in_progress, complete): (i64, i64, i64) = conn.query_row(
        "SELECT
             COUNT(*) FILTER (WHERE status IS NULL),
             COUNT(*) FILTER (WHERE status = 'Submitting'),
             COUNT(*) FILTER (WHERE status = 'Complete')
         FROM entries",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    println!("{}• Entries:{}", CYAN, RESET);
    println!("    pending:     {pending}");
    println!("    in progress: {in_progress}");
    println!("    complete:    {complete}");

    let credentials: i64 =
        conn.query_row("SELECT COUNT(*) FROM credentials", [], |r| r.get(0))?;
    let sessions: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;
    println!("{}• Credentials:{} {credentials}", CYAN, RESET);
    println!("{}• Sessions:{} {sessions}", CYAN, RESET);

    println!();
    Ok(())
}
