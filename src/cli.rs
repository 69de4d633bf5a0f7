use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "browser-actions")]
#[command(
    version,
    about = "Authenticated action dispatcher running browser automations in ephemeral headless sessions",
    long_about = "Browser Actions\n\nExposes browser-driven actions (documentation scraping, HTML-to-PDF rendering) behind an authenticated HTTP dispatcher. Each action runs in its own headless browser session with crash diagnostics reported to an external sink.\n\nRequired environment: BROWSER_AUTOMATIONS_ACCESS_TOKEN, BUGLESSTACK_ACCESS_TOKEN."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for port/timeouts; environment and defaults apply otherwise"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the action dispatcher over HTTP
    Serve {
        #[arg(long, help = "Port to listen on (default 5123, or the config file value)")]
        port: Option<u16>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
