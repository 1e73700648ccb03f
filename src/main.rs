//! # ut — union task assignment and progress CLI
//!
//! Tracks task completion across a three-tier organisation: a central
//! headquarters, 55 branches and 9 regional councils. Headquarters
//! maintains two task catalogs (one per unit class) and assigns tasks
//! per unit; each unit moves its own assigned tasks between
//! not-started, in-progress and done.
//!
//! ## Quick start
//!
//! ```bash
//! # Seed the starter catalog and assignments
//! ut init
//!
//! # Headquarters: manage catalogs and assignments
//! ut task-add "新しいタスク" --class branch
//! ut assign 11 task01
//! ut progress
//!
//! # A branch: work its own board
//! ut --role branch --unit 11 board
//! ut --role branch --unit 11 status task01 done
//! ```
//!
//! ## How writes behave
//!
//! Every write goes through one optimistic path: it lands in memory
//! immediately, is persisted under a deterministic record key, and is
//! rolled back (with a notice naming the failed action) if the store
//! does not acknowledge it. Nothing is retried automatically.
//!
//! Data lives in a single JSON store file, `~/.ut/store.json` by
//! default, overridable with `--db` or `UT_DIR`.

use std::path::PathBuf;

use clap::Parser;

pub mod assignment;
pub mod cli;
pub mod cmd;
pub mod error;
pub mod fields;
pub mod pager;
pub mod progress;
pub mod session;
pub mod store;
pub mod sync;
pub mod task;
pub mod units;

use cli::Cli;
use cmd::Commands;
use session::Session;
use store::FileStore;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Completions and the static unit catalogs never touch the store.
    if let Commands::Completions { shell } = &cli.command {
        cmd::cmd_completions(*shell);
        return;
    }
    if let Commands::Units { class } = &cli.command {
        cmd::cmd_units(*class);
        return;
    }

    let db_path = cli.db.clone().unwrap_or_else(default_store_path);
    let store = match FileStore::open(&db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open store {}: {e}", db_path.display());
            std::process::exit(1);
        }
    };
    let mut session = match Session::new(store, cli.role, cli.unit.clone()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Completions { .. } => unreachable!("handled above"),
        Commands::Init => cmd::cmd_init(&mut session),
        Commands::Tasks { class } => cmd::cmd_tasks(&session, class),
        Commands::TaskAdd {
            title,
            desc,
            sort_order,
            class,
        } => cmd::cmd_task_add(&mut session, class, title, desc, sort_order),
        Commands::TaskUpdate {
            id,
            title,
            desc,
            sort_order,
        } => cmd::cmd_task_update(&mut session, id, title, desc, sort_order),
        Commands::TaskDelete { id } => cmd::cmd_task_delete(&mut session, id),
        Commands::Assign {
            target_id,
            task_id,
            class,
            off,
        } => cmd::cmd_assign(&mut session, class, target_id, task_id, off),
        Commands::Assignments { class } => cmd::cmd_assignments(&session, class),
        Commands::Board => cmd::cmd_board(&session),
        Commands::Status { task_id, status } => cmd::cmd_status(&mut session, task_id, status),
        Commands::Progress { pages, interactive } => {
            cmd::cmd_progress(&session, pages, interactive)
        }
        Commands::Units { .. } => unreachable!("handled above"),
        Commands::Import { input, class } => cmd::cmd_import(&mut session, input, class),
    }
}

/// Resolve the store file: `$UT_DIR/store.json` if set, else
/// `~/.ut/store.json`.
fn default_store_path() -> PathBuf {
    if let Ok(dir) = std::env::var("UT_DIR") {
        return PathBuf::from(dir).join("store.json");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dir = PathBuf::from(home).join(".ut");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Failed to create data directory {}: {e}", dir.display());
        std::process::exit(1);
    }
    dir.join("store.json")
}
