use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::manager::StoreManager;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::entry::Entry;
use crate::ui::messages::success;
use chrono::NaiveDate;

/// Handle the `add` command: save a new draft entry.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Add {
        date,
        hours,
        project,
        tool,
        charge_code,
        description,
    } = cmd
    {
        let date = match date {
            Some(s) => Some(
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| AppError::InvalidDate(s.clone()))?,
            ),
            None => None,
        };

        let entry = Entry::draft(
            date,
            *hours,
            project.clone(),
            tool.clone(),
            charge_code.clone(),
            description.clone(),
        );

        let manager = StoreManager::new(&cfg.database);
        let id = manager.with_conn(|conn| queries::insert_draft(conn, &entry))?;
        success(format!("Draft saved (id {id})."));
    }

    Ok(())
}
