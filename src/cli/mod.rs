//! CLI module for the demand matcher
//!
//! Provides subcommands:
//! - `match`: run demand patterns through the matching pipeline
//! - `config`: print the effective configuration

pub mod matching;
pub mod show_config;

use clap::{Parser, Subcommand};

/// Demand matcher - cached, rate-limited, retried candidate matching
#[derive(Parser)]
#[command(name = "demand-matcher")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Extra configuration file layered over config/default and config/local
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Match one or more demand patterns against the candidate source
    Match(matching::MatchArgs),

    /// Print the effective configuration as JSON
    Config,
}
