use clap::{Parser, Subcommand};

/// Command-line interface definition for timevault
/// Admin/inspection surface over the embedded timesheet store
#[derive(Parser)]
#[command(
    name = "timevault",
    version = env!("CARGO_PKG_VERSION"),
    about = "Embedded timesheet store: drafts, submissions, credentials and schema migrations",
    long_about = None
)]
pub struct Cli {
    /// Override store path (useful for tests or custom locations)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the store and configuration
    Init,

    /// Manage the configuration file
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,
    },

    /// Save a new draft entry (Pending)
    Add {
        /// Date of the entry (YYYY-MM-DD)
        #[arg(long = "date")]
        date: Option<String>,

        /// Worked hours, quarter-hour steps (0.25..=24.0)
        #[arg(long = "hours")]
        hours: f64,

        #[arg(long = "project")]
        project: Option<String>,

        #[arg(long = "tool")]
        tool: Option<String>,

        #[arg(long = "charge-code")]
        charge_code: Option<String>,

        #[arg(long = "desc")]
        description: Option<String>,
    },

    /// List entries (pending by default)
    List {
        #[arg(long = "archive", help = "List completed entries instead")]
        archive: bool,
    },

    /// Delete a draft entry (only while Pending)
    Del {
        /// Entry id
        id: i64,
    },

    /// Mark entries submitted (all-or-nothing)
    Submit {
        /// Entry ids
        #[arg(required = true)]
        ids: Vec<i64>,

        #[arg(
            long = "claim-only",
            help = "Only claim the entries (Pending → InProgress) without completing them"
        )]
        claim_only: bool,
    },

    /// Revert failed in-progress entries back to Pending (all-or-nothing)
    Revert {
        /// Entry ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Crash recovery: sweep every in-progress entry back to Pending
    Reset,

    /// Manage the store (migrations, integrity checks, rebuild)
    Db {
        #[arg(long = "migrate", help = "Run pending store migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check store integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the store using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show store information")]
        info: bool,

        #[arg(
            long = "rebuild",
            help = "DESTRUCTIVE: drop and recreate the whole store"
        )]
        rebuild: bool,
    },

    /// Copy the store file (and WAL companions) to a backup location
    Backup {
        /// Destination file
        file: String,

        #[arg(long = "compress", help = "Compress the backup into a zip archive")]
        compress: bool,
    },
}
