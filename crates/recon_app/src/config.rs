//! Crawl configuration assembly: optional RON file, then command-line overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use recon_engine::CrawlConfig;
use recon_logging::recon_info;

use crate::cli::Cli;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid crawl configuration: {0}")]
    Invalid(#[from] recon_engine::ConfigError),
}

/// Builds the validated crawl configuration for this invocation.
pub fn resolve(cli: &Cli) -> Result<CrawlConfig, ConfigError> {
    let base = match &cli.config {
        Some(path) => load_file(path)?,
        None => CrawlConfig::default(),
    };
    let config = apply_overrides(base, cli);
    config.validate()?;
    Ok(config)
}

pub fn load_file(path: &Path) -> Result<CrawlConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse(&text, path)?;
    recon_info!("Loaded crawl configuration from {:?}", path);
    Ok(config)
}

fn parse(text: &str, path: &Path) -> Result<CrawlConfig, ConfigError> {
    ron::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Flags given on the command line win over the file.
pub fn apply_overrides(mut config: CrawlConfig, cli: &Cli) -> CrawlConfig {
    if let Some(platform) = &cli.platform {
        config.platform = platform.clone();
    }
    if let Some(start_url) = &cli.start_url {
        config.start_url = start_url.clone();
    }
    if let Some(login_url) = &cli.login_url {
        config.login_url = login_url.clone();
    }
    if let Some(username) = &cli.username {
        config.username = username.clone();
    }
    if let Some(password) = &cli.password {
        config.password = password.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(wait) = cli.wait_for_timeout {
        config.wait_for_timeout = wait;
    }
    if cli.screenshots {
        config.screenshot_enabled = true;
    }
    if cli.no_data_sources {
        config.extract_data_sources = false;
    }
    if cli.no_markets {
        config.extract_markets = false;
    }
    if cli.no_methodology {
        config.extract_methodology = false;
    }
    config
}
