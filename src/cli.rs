//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// qrlinker - dynamic QR code redirect service
#[derive(Parser)]
#[command(name = "qrlinker")]
#[command(version)]
#[command(about = "Dynamic QR code redirect service with A/B experiments", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Hash a code password with Argon2id
    HashPassword {
        /// Plaintext password
        password: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: stdout)
        output_path: Option<String>,
    },
}
