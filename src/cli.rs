//! Command-line interface definitions for the Nanfang+ harvester.
//!
//! Global options override the matching keys of the YAML configuration.
//! Credentials and the data directory can also come from the environment.

use crate::config::{Config, StorageKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Everything an account has published, with comments
/// nfplus_harvest --data-dir ./data account 中山大学
///
/// # Article URLs exported from the app, one per line
/// nfplus_harvest urls --file listing.txt
///
/// # Inspect one page without keeping anything
/// nfplus_harvest --storage memory article https://static.nfnews.com/content/c1.html
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory the tables are written to
    #[arg(short, long, global = true, env = "NFPLUS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage backend
    #[arg(short, long, global = true, value_enum)]
    pub storage: Option<StorageKind>,

    /// Device id sent with account searches
    #[arg(long, global = true, env = "NFPLUS_DEVICE_ID", hide_env_values = true)]
    pub device_id: Option<String>,

    /// Request signature sent with account searches
    #[arg(long, global = true, env = "NFPLUS_SIGN", hide_env_values = true)]
    pub sign: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Find an account by exact name and harvest its column
    Account { name: String },

    /// Harvest every article of a column by id
    Column { id: String },

    /// Harvest article URLs listed in a file (stdin when omitted)
    Urls {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Harvest one article page and print it as JSON
    Article { url: String },
}

impl Cli {
    /// Apply the options given on the command line (or via env) to `config`.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(kind) = self.storage {
            config.storage = kind;
        }
        if let Some(device_id) = &self.device_id {
            config.device_id = device_id.clone();
        }
        if let Some(sign) = &self.sign {
            config.sign = sign.clone();
        }
    }
}
