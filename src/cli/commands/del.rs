use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::manager::StoreManager;
use crate::db::queries;
use crate::errors::AppResult;
use crate::ui::messages::{success, warning};

/// Handle the `del` command: remove a draft (Pending entries only).
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Del { id } = cmd {
        let manager = StoreManager::new(&cfg.database);
        let changed = manager.with_conn(|conn| queries::delete_draft(conn, *id))?;

        if changed == 1 {
            success(format!("Draft {id} deleted."));
        } else {
            warning(format!("Entry {id} not found or no longer Pending."));
        }
    }

    Ok(())
}
