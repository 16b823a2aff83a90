use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::manager::StoreManager;
use crate::db::status;
use crate::errors::AppResult;
use crate::ui::messages::success;

/// Handle the `revert` command: InProgress → Pending, all-or-nothing.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Revert { ids } = cmd {
        let manager = StoreManager::new(&cfg.database);
        let reverted = manager.with_conn(|conn| status::revert_failed(conn, ids))?;
        success(format!(
            "Reverted {reverted} entr{} to Pending.",
            if reverted == 1 { "y" } else { "ies" }
        ));
    }

    Ok(())
}
