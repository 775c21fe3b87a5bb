//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use connkeep_core::SecretKind;

/// `ConnKeep` command-line interface for connection secrets
#[derive(Parser)]
#[command(name = "connkeep-cli")]
#[command(author, version, about = "ConnKeep connection secret tool")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true, env = "CONNKEEP_CONFIG_DIR")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Keep secrets in memory for this run instead of the desktop keyring
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the store key a secret is saved under
    Target {
        /// Connection identifier
        connection: String,

        /// Kind of secret
        #[arg(short, long, value_enum, default_value = "password")]
        kind: KindArg,
    },

    /// Save a secret for a connection
    #[command(about = "Save a secret, read from the terminal")]
    Set {
        /// Connection identifier
        connection: String,

        /// Kind of secret
        #[arg(short, long, value_enum, default_value = "password")]
        kind: KindArg,

        /// Account name saved with the secret
        #[arg(short, long)]
        user: Option<String>,

        /// Display name used in prompts
        #[arg(short, long)]
        name: Option<String>,

        /// Read the secret from standard input instead of the terminal
        #[arg(long)]
        stdin: bool,
    },

    /// Check for or print a saved secret
    Get {
        /// Connection identifier
        connection: String,

        /// Kind of secret
        #[arg(short, long, value_enum, default_value = "password")]
        kind: KindArg,

        /// Print the secret instead of only reporting that it exists
        #[arg(long)]
        reveal: bool,

        /// Ask for the secret if none is saved, and save the answer
        #[arg(long)]
        prompt: bool,

        /// Read a prompted secret from standard input
        #[arg(long, requires = "prompt")]
        stdin: bool,
    },

    /// Delete every saved secret of a connection
    Delete {
        /// Connection identifier
        connection: String,
    },

    /// Drop a cached secret, leaving the saved copy alone
    Clear {
        /// Connection identifier
        connection: String,

        /// Kind of secret
        #[arg(short, long, value_enum, default_value = "password")]
        kind: KindArg,
    },
}

/// Secret kind argument
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    /// Login password
    Password,
    /// SSH key passphrase
    Passphrase,
}

impl From<KindArg> for SecretKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Password => Self::Password,
            KindArg::Passphrase => Self::SshKeyPassphrase,
        }
    }
}
