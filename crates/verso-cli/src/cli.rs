use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "verso", about = "verso: versioned site hosting", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the verso server
    Serve(ServeArgs),
    /// List sites recorded in the state directory
    Sites(ConfigPathArgs),
    /// Show a site's saved versions
    History(HistoryArgs),
    /// Inspect or generate configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ConfigPathArgs {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "verso.toml")]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub config: ConfigPathArgs,
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub config: ConfigPathArgs,
    /// Site name
    pub site: String,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the default configuration as TOML
    Init,
    /// Validate a configuration file
    Check(ConfigPathArgs),
}
