use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::fields::Role;

/// Task assignment and progress tracker for headquarters, branches and
/// regional councils. Storage defaults to ~/.ut/store.json or a path
/// passed via --db.
#[derive(Parser)]
#[command(name = "ut", version, about = "Union task assignment and progress CLI")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Active role.
    #[arg(long, global = true, value_enum, default_value_t = Role::Headquarters)]
    pub role: Role,

    /// Unit id for subordinate roles (branch number or council mnemonic).
    #[arg(long, global = true)]
    pub unit: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
