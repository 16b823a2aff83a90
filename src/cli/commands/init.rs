use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::manager::StoreManager;
use crate::db::status;
use crate::errors::AppResult;
use crate::ui::messages::{success, warning};

/// Handle the `init` command
///
/// This initializes:
///  - the config directory (if missing)
///  - the configuration file
///  - the store itself (schema + all pending migrations)
/// and runs the startup crash-recovery sweep.
pub fn handle(cli: &Cli) -> AppResult<()> {
    let cfg = Config::init_all(cli.db.clone(), cli.test)?;

    println!("⚙️  Initializing timevault…");
    println!("📄 Config file : {}", Config::config_file().display());
    println!("🗄️  Store      : {}", &cfg.database);

    let manager = StoreManager::new(&cfg.database);

    // first use opens the handle, ensures the schema and migrates
    let recovered = manager.with_conn(|conn| status::reset_all_in_progress(conn))?;
    if recovered > 0 {
        warning(format!(
            "Recovered {recovered} in-progress entr{} from a previous session",
            if recovered == 1 { "y" } else { "ies" }
        ));
    }

    success(format!("Store initialized at {}", &cfg.database));
    Ok(())
}
