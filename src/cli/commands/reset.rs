use crate::config::Config;
use crate::db::manager::StoreManager;
use crate::db::status;
use crate::errors::AppResult;
use crate::ui::messages::{info, success};

/// Handle the `reset` command: startup crash recovery, sweeping every
/// InProgress entry back to Pending.
pub fn handle(cfg: &Config) -> AppResult<()> {
    let manager = StoreManager::new(&cfg.database);
    let swept = manager.with_conn(|conn| status::reset_all_in_progress(conn))?;

    if swept == 0 {
        info("No in-progress entries to recover.");
    } else {
        success(format!(
            "Reset {swept} in-progress entr{} to Pending.",
            if swept == 1 { "y" } else { "ies" }
        ));
    }
    Ok(())
}
