use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::manager::StoreManager;
use crate::db::queries;
use crate::errors::AppResult;
use crate::models::entry::Entry;
use crate::utils::colors::{GREY, RESET};

/// Handle the `list` command: pending drafts, or the archive with `--archive`.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::List { archive } = cmd {
        let manager = StoreManager::new(&cfg.database);
        let entries = manager.with_conn(|conn| {
            if *archive {
                queries::load_archive(conn)
            } else {
                queries::load_pending(conn)
            }
        })?;

        if entries.is_empty() {
            println!("{}(no entries){}", GREY, RESET);
            return Ok(());
        }

        for entry in &entries {
            print_row(entry, *archive);
        }
        println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    }

    Ok(())
}

fn print_row(entry: &Entry, archive: bool) {
    let date = entry.date_str().unwrap_or_else(|| "----------".to_string());
    let project = entry.project.as_deref().unwrap_or("--");
    let description = entry.description.as_deref().unwrap_or("--");

    if archive {
        let submitted = entry.submitted_at.as_deref().unwrap_or("--");
        println!(
            "{:>5}  {}  {:>5.2}h  {:<24} {:<32} submitted {}",
            entry.id, date, entry.hours, project, description, submitted
        );
    } else {
        println!(
            "{:>5}  {}  {:>5.2}h  {:<24} {}",
            entry.id, date, entry.hours, project, description
        );
    }
}
