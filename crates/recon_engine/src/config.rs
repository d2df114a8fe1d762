use std::fmt;
use std::time::Duration;

use recon_core::CrawlLimits;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::extract::ExtractionToggles;

/// Immutable crawl input. Every field is optional in serialized form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrawlConfig {
    /// Display name recorded in the report.
    pub platform: String,
    pub start_url: String,
    /// Defaults to `<start origin>/login` when empty.
    pub login_url: String,
    pub username: String,
    pub password: String,
    /// Page budget for the whole crawl.
    pub max_pages: usize,
    /// Settle delay after navigation, in milliseconds.
    pub wait_for_timeout: u64,
    pub screenshot_enabled: bool,
    pub extract_data_sources: bool,
    pub extract_markets: bool,
    pub extract_methodology: bool,
    /// Upper bound for every suspending driver call.
    pub driver_timeout_ms: u64,
    /// How long to wait for the login form to appear.
    pub login_timeout_ms: u64,
    /// Capacity of the per-visit network event channel.
    pub network_buffer: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            platform: "Target Platform".to_string(),
            start_url: String::new(),
            login_url: String::new(),
            username: String::new(),
            password: String::new(),
            max_pages: 20,
            wait_for_timeout: 5_000,
            screenshot_enabled: false,
            extract_data_sources: true,
            extract_markets: true,
            extract_methodology: true,
            driver_timeout_ms: 60_000,
            login_timeout_ms: 10_000,
            network_buffer: 1_024,
        }
    }
}

impl fmt::Debug for CrawlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlConfig")
            .field("platform", &self.platform)
            .field("start_url", &self.start_url)
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("max_pages", &self.max_pages)
            .field("wait_for_timeout", &self.wait_for_timeout)
            .field("screenshot_enabled", &self.screenshot_enabled)
            .field("extract_data_sources", &self.extract_data_sources)
            .field("extract_markets", &self.extract_markets)
            .field("extract_methodology", &self.extract_methodology)
            .field("driver_timeout_ms", &self.driver_timeout_ms)
            .field("login_timeout_ms", &self.login_timeout_ms)
            .field("network_buffer", &self.network_buffer)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("maxPages must be at least 1")]
    ZeroPageBudget,
    #[error("startUrl {0:?} is not an absolute http(s) URL")]
    InvalidStartUrl(String),
    #[error("loginUrl {0:?} is not an absolute http(s) URL")]
    InvalidLoginUrl(String),
}

impl CrawlConfig {
    /// Anonymous mode unless both credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroPageBudget);
        }
        parse_http_url(&self.start_url)
            .ok_or_else(|| ConfigError::InvalidStartUrl(self.start_url.clone()))?;
        if !self.login_url.is_empty() && parse_http_url(&self.login_url).is_none() {
            return Err(ConfigError::InvalidLoginUrl(self.login_url.clone()));
        }
        Ok(())
    }

    pub fn resolved_login_url(&self) -> String {
        if !self.login_url.is_empty() {
            return self.login_url.clone();
        }
        parse_http_url(&self.start_url)
            .and_then(|start| start.join("/login").ok())
            .map(|url| url.to_string())
            .unwrap_or_default()
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.wait_for_timeout)
    }

    pub fn driver_timeout(&self) -> Duration {
        Duration::from_millis(self.driver_timeout_ms.max(1))
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn crawl_limits(&self) -> CrawlLimits {
        CrawlLimits {
            max_pages: self.max_pages,
            has_credentials: self.has_credentials(),
        }
    }

    pub fn extraction_toggles(&self) -> ExtractionToggles {
        ExtractionToggles {
            data_sources: self.extract_data_sources,
            markets: self.extract_markets,
            methodology: self.extract_methodology,
        }
    }
}

fn parse_http_url(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}
