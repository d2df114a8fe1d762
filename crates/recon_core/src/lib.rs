//! Recon core: pure crawl-queue state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, FinishReason};
pub use msg::Msg;
pub use state::{
    normalize_url_for_dedupe, Admission, CrawlLimits, CrawlState, SessionState, VisitId,
    VisitOutcome,
};
pub use update::update;
pub use view_model::{CrawlView, DiscoveryStats, VisitRowView};
