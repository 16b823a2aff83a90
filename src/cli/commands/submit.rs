use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::manager::StoreManager;
use crate::db::status;
use crate::errors::AppResult;
use crate::ui::messages::success;

/// Handle the `submit` command.
///
/// `--claim-only` performs the advisory Pending → InProgress claim; the
/// default path marks the whole id set Complete, all-or-nothing.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Submit { ids, claim_only } = cmd {
        let manager = StoreManager::new(&cfg.database);

        if *claim_only {
            let claimed = manager.with_conn(|conn| status::mark_in_progress(conn, ids))?;
            success(format!("Claimed {claimed} entr{}.", plural(claimed)));
        } else {
            let submitted = manager.with_conn(|conn| status::mark_submitted(conn, ids))?;
            success(format!("Marked {submitted} entr{} Complete.", plural(submitted)));
        }
    }

    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "y" } else { "ies" }
}
