use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::backup::archive_store;
use crate::errors::AppResult;
use crate::ui::messages::success;
use std::path::Path;

/// Handle the `backup` command: copy the store (plus WAL companions) to a
/// user-chosen location, optionally zipped.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Backup { file, compress } = cmd {
        let written = archive_store(Path::new(&cfg.database), Path::new(file), *compress)?;
        success(format!("Backup created: {}", written.display()));
    }

    Ok(())
}
