#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Seed the frontier with the start URL and begin crawling.
    Start { start_url: String },
    /// The runner finished the visit it was handed.
    VisitFinished {
        visit_id: crate::VisitId,
        outcome: crate::VisitOutcome,
        /// Relevant links proposed by link discovery, absolute URLs.
        discovered: Vec<String>,
    },
    /// External stop (Ctrl-C, caller cancellation).
    StopRequested,
}
