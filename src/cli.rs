use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{CheckConfigOverrides, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "mapcheck", version, about = "Check rhythm-game levels for hidden, stacked and unreachable objects")]
pub struct Cli {
    /// Configuration file; defaults are used when it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory scanned for `*.rhai` rule scripts.
    #[arg(long, global = true)]
    pub scripts_dir: Option<PathBuf>,

    /// Operation budget for a single script rule run.
    #[arg(long, global = true)]
    pub max_operations: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List every available rule.
    List,
    /// Show a rule's parameters and their defaults.
    Describe {
        rule: String,
    },
    /// Run one rule against a level file.
    Run {
        /// Level file in v2 beatmap JSON format.
        level: PathBuf,
        /// Rule display name (case-insensitive).
        #[arg(short, long)]
        rule: String,
        /// Parameter values in declaration order; omitted trailing values use defaults.
        #[arg(short, long = "param")]
        params: Vec<String>,
        /// Print one JSON object per flagged object.
        #[arg(long)]
        json: bool,
        /// Exit with status 2 when only warnings were found.
        #[arg(long)]
        fail_on_warn: bool,
    },
}

impl Cli {
    pub fn config_overrides(&self) -> CheckConfigOverrides {
        CheckConfigOverrides { scripts_dir: self.scripts_dir.clone(), max_operations: self.max_operations }
    }
}
