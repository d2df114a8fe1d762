use std::fmt;
use std::time::Duration;

use crate::inspect::InspectError;

/// Step of the per-page pipeline, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticating,
    Navigating,
    Settling,
    Capturing,
    Extracting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Authenticating => "authentication",
            Stage::Navigating => "navigation",
            Stage::Settling => "settling",
            Stage::Capturing => "screenshot capture",
            Stage::Extracting => "extraction",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("http status {status} for {url}")]
    HttpStatus { url: String, status: u16 },
    #[error("driver call timed out")]
    Timeout,
    #[error("invalid selector {0:?}")]
    InvalidSelector(String),
    #[error("no element matches {0:?}")]
    ElementNotFound(String),
    #[error("element {selector:?} cannot be used: {reason}")]
    NotInteractable { selector: String, reason: String },
    #[error("{0} is not supported by this driver")]
    Unsupported(&'static str),
    #[error("no page is loaded")]
    NoPage,
    #[error("driver i/o failed: {0}")]
    Io(String),
    #[error("browser crashed: {0}")]
    Crashed(String),
}

impl DriverError {
    /// Only a crashed browser aborts the run; everything else stays inside its page visit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Crashed(_))
    }
}

/// Failure contained at the per-visit boundary.
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("{stage} failed: {source}")]
    Driver {
        stage: Stage,
        #[source]
        source: DriverError,
    },
    #[error("{stage} timed out after {limit:?}")]
    Timeout { stage: Stage, limit: Duration },
    #[error("page inspection failed: {0}")]
    Inspect(#[from] InspectError),
    #[error("visit cancelled")]
    Cancelled,
}

impl VisitError {
    pub(crate) fn from_driver(stage: Stage, limit: Duration, source: DriverError) -> Self {
        match source {
            DriverError::Timeout => VisitError::Timeout { stage, limit },
            source => VisitError::Driver { stage, source },
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, VisitError::Driver { source, .. } if source.is_fatal())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("browser driver failed fatally during {stage}: {source}")]
    DriverFatal {
        stage: Stage,
        #[source]
        source: DriverError,
    },
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("invalid keyword pattern: {0}")]
    Extractor(#[from] crate::extract::ExtractorError),
}
