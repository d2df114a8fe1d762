use std::collections::{BTreeMap, BTreeSet, VecDeque};

use url::Url;

use crate::view_model::{CrawlView, DiscoveryStats, VisitRowView};

pub type VisitId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    /// Frontier exhausted or page budget spent.
    Drained,
    /// Stopped from outside before the frontier drained.
    Stopped,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Drained | SessionState::Stopped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    Success,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    /// Upper bound on page visits over the crawl's lifetime. Zero is treated as one.
    pub max_pages: usize,
    pub has_credentials: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(VisitId),
    Duplicate,
    BudgetExhausted,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VisitEntry {
    url: String,
    authenticate: bool,
    dispatched: bool,
    outcome: Option<VisitOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    limits: CrawlLimits,
    session: SessionState,
    frontier: VecDeque<VisitId>,
    scheduled: BTreeSet<String>,
    visits: BTreeMap<VisitId, VisitEntry>,
    in_flight: Option<VisitId>,
    next_visit_id: VisitId,
    last_discovery: Option<DiscoveryStats>,
    dirty: bool,
}

impl CrawlState {
    pub fn new(limits: CrawlLimits) -> Self {
        Self {
            limits: CrawlLimits {
                max_pages: limits.max_pages.max(1),
                ..limits
            },
            session: SessionState::Idle,
            frontier: VecDeque::new(),
            scheduled: BTreeSet::new(),
            visits: BTreeMap::new(),
            in_flight: None,
            next_visit_id: 1,
            last_discovery: None,
            dirty: false,
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn in_flight(&self) -> Option<VisitId> {
        self.in_flight
    }

    /// URLs admitted so far count against the budget whether or not they were visited yet.
    pub fn remaining_budget(&self) -> usize {
        self.limits.max_pages.saturating_sub(self.visits.len())
    }

    /// Number of visits handed to the runner so far.
    pub fn dispatched_count(&self) -> usize {
        self.visits.values().filter(|v| v.dispatched).count()
    }

    pub fn view(&self) -> CrawlView {
        let visits: Vec<VisitRowView> = self
            .visits
            .iter()
            .filter(|(_, entry)| entry.dispatched)
            .map(|(visit_id, entry)| VisitRowView {
                visit_id: *visit_id,
                url: entry.url.clone(),
                authenticate: entry.authenticate,
                outcome: entry.outcome,
            })
            .collect();
        let succeeded = visits
            .iter()
            .filter(|v| v.outcome == Some(VisitOutcome::Success))
            .count();
        let failed = visits
            .iter()
            .filter(|v| matches!(v.outcome, Some(VisitOutcome::Failed | VisitOutcome::Cancelled)))
            .count();

        CrawlView {
            session: self.session,
            frontier_len: self.frontier.len(),
            visited: visits.len(),
            succeeded,
            failed,
            remaining_budget: self.remaining_budget(),
            visits,
            last_discovery: self.last_discovery.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_session(&mut self, session: SessionState) {
        if self.session != session {
            self.session = session;
            self.mark_dirty();
        }
    }

    pub(crate) fn admit(&mut self, raw_url: &str) -> Admission {
        let Some(key) = normalize_url_for_dedupe(raw_url) else {
            return Admission::Invalid;
        };
        if self.scheduled.contains(&key) {
            return Admission::Duplicate;
        }
        if self.remaining_budget() == 0 {
            return Admission::BudgetExhausted;
        }

        let visit_id = self.next_visit_id;
        self.next_visit_id += 1;
        // Only the first visit of a credentialed crawl logs in; the session is reused afterwards.
        let authenticate = visit_id == 1 && self.limits.has_credentials;
        self.scheduled.insert(key);
        self.visits.insert(
            visit_id,
            VisitEntry {
                url: raw_url.trim().to_string(),
                authenticate,
                dispatched: false,
                outcome: None,
            },
        );
        self.frontier.push_back(visit_id);
        self.mark_dirty();
        Admission::Admitted(visit_id)
    }

    pub(crate) fn admit_discovered(&mut self, urls: &[String]) {
        let mut stats = DiscoveryStats::default();
        for url in urls {
            match self.admit(url) {
                Admission::Admitted(_) => stats.enqueued += 1,
                Admission::Duplicate => stats.duplicates += 1,
                Admission::BudgetExhausted => stats.over_budget += 1,
                Admission::Invalid => stats.invalid += 1,
            }
        }
        if !urls.is_empty() {
            self.last_discovery = Some(stats);
            self.mark_dirty();
        }
    }

    /// Pops the next frontier entry if no visit is outstanding.
    pub(crate) fn dispatch_next(&mut self) -> Option<(VisitId, String, bool)> {
        if self.in_flight.is_some() {
            return None;
        }
        let visit_id = self.frontier.pop_front()?;
        let entry = self.visits.get_mut(&visit_id)?;
        entry.dispatched = true;
        self.in_flight = Some(visit_id);
        self.dirty = true;
        Some((visit_id, entry.url.clone(), entry.authenticate))
    }

    /// Records the outcome of the outstanding visit. Returns false for unknown or stale ids.
    pub(crate) fn complete(&mut self, visit_id: VisitId, outcome: VisitOutcome) -> bool {
        if self.in_flight != Some(visit_id) {
            return false;
        }
        self.in_flight = None;
        if let Some(entry) = self.visits.get_mut(&visit_id) {
            entry.outcome = Some(outcome);
        }
        self.mark_dirty();
        true
    }

    /// Drops every queued-but-unvisited URL.
    pub(crate) fn clear_frontier(&mut self) {
        for visit_id in self.frontier.drain(..) {
            self.visits.remove(&visit_id);
        }
        self.mark_dirty();
    }
}

/// Canonical form used to decide whether a URL was already scheduled.
///
/// Scheme and host are lowercased by the parser, fragments are dropped and a
/// trailing slash on a non-root path is ignored. Relative or unparsable input
/// yields `None`.
pub fn normalize_url_for_dedupe(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_url_for_dedupe;

    #[test]
    fn normalization_folds_common_variants() {
        let canonical = normalize_url_for_dedupe("https://example.com/").unwrap();
        assert_eq!(normalize_url_for_dedupe("HTTPS://EXAMPLE.COM").unwrap(), canonical);
        assert_eq!(normalize_url_for_dedupe("  https://example.com  ").unwrap(), canonical);
        assert_eq!(
            normalize_url_for_dedupe("https://example.com/markets/#top"),
            normalize_url_for_dedupe("https://example.com/markets")
        );
    }

    #[test]
    fn query_strings_stay_significant() {
        assert_ne!(
            normalize_url_for_dedupe("https://example.com/prices?week=1"),
            normalize_url_for_dedupe("https://example.com/prices?week=2")
        );
    }

    #[test]
    fn relative_and_non_http_urls_are_rejected() {
        assert_eq!(normalize_url_for_dedupe("/dashboard"), None);
        assert_eq!(normalize_url_for_dedupe("mailto:ops@example.com"), None);
        assert_eq!(normalize_url_for_dedupe(""), None);
    }
}
