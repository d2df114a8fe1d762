//! Login sequence against the target platform.
//!
//! Success is judged from the URL the session lands on after submitting the
//! form. That check is a best-effort heuristic: a post-login page whose URL
//! happens to contain "login" is reported as a failed login.

use std::time::Duration;

use recon_logging::{recon_debug, recon_info, recon_warn};

use crate::driver::{first_present, wait_for_any, with_timeout, BrowserDriver, DEFAULT_POLL_INTERVAL};
use crate::DriverError;

/// Username field candidates, most specific first.
pub const USERNAME_SELECTORS: &[&str] = &[
    "input[type=\"email\"]",
    "input[name=\"email\"]",
    "input[name=\"username\"]",
    "input[id=\"email\"]",
    "input[id=\"username\"]",
    "input[type=\"text\"]",
];

pub const PASSWORD_SELECTORS: &[&str] = &[
    "input[type=\"password\"]",
    "input[name=\"password\"]",
    "input[id=\"password\"]",
];

pub const SUBMIT_SELECTORS: &[&str] = &[
    "button[type=\"submit\"]",
    "input[type=\"submit\"]",
    "button",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated { landing_url: String },
    SkippedNoCredentials,
    FailedLogin(AuthFailure),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("login form not found within {0:?}")]
    LoginFormNotFound(Duration),
    #[error("login form has no {0} field")]
    MissingField(&'static str),
    #[error("session is still on a login page: {0}")]
    Rejected(String),
    #[error("driver failed during login: {0}")]
    Driver(#[from] DriverError),
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    form_timeout: Duration,
    call_timeout: Duration,
    poll_interval: Duration,
}

impl Authenticator {
    pub fn new(form_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            form_timeout,
            call_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Never fails: driver errors are folded into `FailedLogin`.
    pub async fn authenticate<D>(
        &self,
        driver: &mut D,
        login_url: &str,
        username: &str,
        password: &str,
    ) -> AuthOutcome
    where
        D: BrowserDriver + ?Sized,
    {
        if username.is_empty() || password.is_empty() {
            recon_info!("No credentials configured, crawling anonymously");
            return AuthOutcome::SkippedNoCredentials;
        }

        match self.login(driver, login_url, username, password).await {
            Ok(landing_url) => {
                recon_info!("Logged in, landed on {}", landing_url);
                AuthOutcome::Authenticated { landing_url }
            }
            Err(failure) => {
                recon_warn!("Login failed, continuing unauthenticated: {}", failure);
                AuthOutcome::FailedLogin(failure)
            }
        }
    }

    async fn login<D>(
        &self,
        driver: &mut D,
        login_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, AuthFailure>
    where
        D: BrowserDriver + ?Sized,
    {
        let limit = self.call_timeout;
        recon_debug!("Opening login page {}", login_url);
        with_timeout(limit, driver.navigate(login_url)).await?;
        with_timeout(limit, driver.wait_for_network_idle()).await?;

        let username_field = wait_for_any(
            driver,
            USERNAME_SELECTORS,
            self.form_timeout,
            self.poll_interval,
            limit,
        )
        .await?
        .ok_or(AuthFailure::LoginFormNotFound(self.form_timeout))?;
        with_timeout(limit, driver.type_into(username_field, username)).await?;

        let password_field = first_present(driver, PASSWORD_SELECTORS, limit)
            .await?
            .ok_or(AuthFailure::MissingField("password"))?;
        with_timeout(limit, driver.type_into(password_field, password)).await?;

        let submit = first_present(driver, SUBMIT_SELECTORS, limit)
            .await?
            .ok_or(AuthFailure::MissingField("submit"))?;
        recon_debug!("Submitting login form via {}", submit);
        with_timeout(limit, driver.click(submit)).await?;
        with_timeout(limit, driver.wait_for_network_idle()).await?;

        let landing_url = with_timeout(limit, driver.current_url()).await?;
        if login_succeeded(&landing_url) {
            Ok(landing_url)
        } else {
            Err(AuthFailure::Rejected(landing_url))
        }
    }
}

/// Post-submit URL check: off the login path, or explicitly on a dashboard / app path.
pub fn login_succeeded(landing_url: &str) -> bool {
    let lowered = landing_url.to_lowercase();
    !lowered.contains("login") || lowered.contains("dashboard") || lowered.contains("/app")
}
