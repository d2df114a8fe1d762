#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run the per-page pipeline for `url`. At most one of these is outstanding.
    VisitPage {
        visit_id: crate::VisitId,
        url: String,
        authenticate: bool,
    },
    /// The crawl reached a terminal state; no further effects follow.
    Finished { reason: FinishReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Drained,
    Stopped,
}
