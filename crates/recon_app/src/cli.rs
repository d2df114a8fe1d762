//! Command-line surface of the `recon` binary.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Crawl a market-intelligence platform and report which shrimp-market data
/// sources, markets and methodology it exposes.
#[derive(Parser)]
#[command(name = "recon", version, about)]
pub struct Cli {
    /// RON file holding a crawl configuration. Flags below override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// First page of the crawl.
    #[arg(long, value_name = "URL")]
    pub start_url: Option<String>,

    /// Login page. Defaults to `/login` on the start URL's origin.
    #[arg(long, value_name = "URL")]
    pub login_url: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long, env = "RECON_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Page budget for the whole crawl.
    #[arg(long, value_name = "N")]
    pub max_pages: Option<usize>,

    /// Settle delay after each navigation, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub wait_for_timeout: Option<u64>,

    /// Capture a screenshot of every visited page.
    #[arg(long)]
    pub screenshots: bool,

    #[arg(long)]
    pub no_data_sources: bool,

    #[arg(long)]
    pub no_markets: bool,

    #[arg(long)]
    pub no_methodology: bool,

    /// Display name recorded in the report.
    #[arg(long)]
    pub platform: Option<String>,

    /// Where the report, the report log and screenshots are written.
    #[arg(long, value_name = "DIR", default_value = "recon-output")]
    pub output_dir: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log to the terminal only, without writing ./recon.log.
    #[arg(long)]
    pub no_log_file: bool,
}
