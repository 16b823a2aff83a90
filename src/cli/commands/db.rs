use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::manager::StoreManager;
use crate::db::stats;
use crate::errors::{AppError, AppResult};
use crate::utils::colors::{CYAN, GREEN, RED, RESET};
use std::path::Path;

/// Handle the `db` command (migrations, integrity check, vacuum, info,
/// destructive rebuild).
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Db {
        migrate,
        check,
        vacuum,
        info,
        rebuild,
    } = cmd
    {
        let manager = StoreManager::new(&cfg.database);

        //
        // 1) MIGRATE
        //
        if *migrate {
            println!("{}▶ Running migrations…{}", CYAN, RESET);
            let report = manager.run_migrations()?;
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| AppError::Other(format!("cannot serialize report: {e}")))?;
            println!("{json}");
            println!("{}✔ Migration completed.{}\n", GREEN, RESET);
        }

        //
        // 2) INFO
        //
        if *info {
            manager.with_conn(|conn| stats::print_store_info(conn, Path::new(&cfg.database)))?;
        }

        //
        // 3) CHECK
        //
        if *check {
            println!("{}▶ Running integrity check…{}", CYAN, RESET);

            let integrity: String = manager.with_conn(|conn| {
                Ok(conn.query_row("PRAGMA integrity_check;", [], |row| row.get(0))?)
            })?;

            if integrity == "ok" {
                println!("{}✔ Integrity check passed.{}\n", GREEN, RESET);
            } else {
                println!("{}✘ Integrity check failed:{} {}\n", RED, RESET, integrity);
            }
        }

        //
        // 4) VACUUM
        //
        if *vacuum {
            println!("{}▶ Running VACUUM…{}", CYAN, RESET);
            manager.with_conn(|conn| {
                conn.execute_batch("VACUUM;")?;
                Ok(())
            })?;
            println!("{}✔ Vacuum completed.{}\n", GREEN, RESET);
        }

        //
        // 5) REBUILD (destructive)
        //
        if *rebuild {
            println!("{}▶ Rebuilding store from scratch…{}", RED, RESET);
            let report = manager.rebuild_store()?;
            println!(
                "{}✔ Store rebuilt (schema version {}).{}\n",
                GREEN, report.to_version, RESET
            );
        }
    }

    Ok(())
}
