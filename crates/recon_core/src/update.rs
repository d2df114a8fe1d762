use crate::{Admission, CrawlState, Effect, FinishReason, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
///
/// At most one `Effect::VisitPage` is outstanding at any time; the next one is
/// only emitted once the runner reports `Msg::VisitFinished` for the current one.
pub fn update(mut state: CrawlState, msg: Msg) -> (CrawlState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start { start_url } => {
            if state.session() != SessionState::Idle {
                return (state, Vec::new());
            }
            match state.admit(&start_url) {
                Admission::Admitted(_) => {
                    state.set_session(SessionState::Running);
                    dispatch_or_drain(&mut state)
                }
                _ => {
                    state.set_session(SessionState::Drained);
                    vec![Effect::Finished {
                        reason: FinishReason::Drained,
                    }]
                }
            }
        }
        Msg::VisitFinished {
            visit_id,
            outcome,
            discovered,
        } => {
            if !state.complete(visit_id, outcome) {
                return (state, Vec::new());
            }
            match state.session() {
                SessionState::Running => {
                    state.admit_discovered(&discovered);
                    dispatch_or_drain(&mut state)
                }
                SessionState::Stopped => vec![Effect::Finished {
                    reason: FinishReason::Stopped,
                }],
                SessionState::Idle | SessionState::Drained => Vec::new(),
            }
        }
        Msg::StopRequested => match state.session() {
            SessionState::Idle | SessionState::Running => {
                state.set_session(SessionState::Stopped);
                state.clear_frontier();
                if state.in_flight().is_none() {
                    vec![Effect::Finished {
                        reason: FinishReason::Stopped,
                    }]
                } else {
                    // The outstanding visit reports back first; Finished follows it.
                    Vec::new()
                }
            }
            SessionState::Drained | SessionState::Stopped => Vec::new(),
        },
    };

    (state, effects)
}

fn dispatch_or_drain(state: &mut CrawlState) -> Vec<Effect> {
    match state.dispatch_next() {
        Some((visit_id, url, authenticate)) => vec![Effect::VisitPage {
            visit_id,
            url,
            authenticate,
        }],
        None => {
            state.set_session(SessionState::Drained);
            vec![Effect::Finished {
                reason: FinishReason::Drained,
            }]
        }
    }
}
