use crate::{SessionState, VisitId, VisitOutcome};

/// What happened to the links proposed by the most recent visit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryStats {
    pub enqueued: usize,
    pub duplicates: usize,
    pub over_budget: usize,
    pub invalid: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlView {
    pub session: SessionState,
    pub frontier_len: usize,
    pub visited: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub remaining_budget: usize,
    pub visits: Vec<VisitRowView>,
    pub last_discovery: Option<DiscoveryStats>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRowView {
    pub visit_id: VisitId,
    pub url: String,
    pub authenticate: bool,
    pub outcome: Option<VisitOutcome>,
}
