use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "idr",
    about = "Identity reconciliation: link contacts that share an email or phone number",
    version,
)]
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
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Reconcile one email/phone pair against a contact database
    Identify(IdentifyArgs),
    /// Show the identity cluster containing a contact
    Show(ShowArgs),
    /// Check that every cluster is flat and fully linked
    Check(CheckArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen address, overriding the config file
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// SQLite database, overriding the configured store
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Args)]
pub struct IdentifyArgs {
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub db: PathBuf,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Any contact id in the cluster
    pub id: u64,
    #[arg(long)]
    pub db: PathBuf,
}

#[derive(Args)]
pub struct CheckArgs {
    #[arg(long)]
    pub db: PathBuf,
}
