use crate::domain_model::AccessToken;
use crate::domain_port::RefreshError;
use tokio::sync::oneshot;

pub type RefreshOutcome = Result<AccessToken, RefreshError>;

/// Completion handle of a request parked on the in-flight refresh.
pub type RefreshWaiter = oneshot::Sender<RefreshOutcome>;

/// Two-state machine guarding the single in-flight refresh call.
///
/// Callers hold the surrounding lock only across `join` and `settle`; neither
/// suspends, so check-then-transition is atomic for every caller.
#[derive(Debug, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    Refreshing {
        waiters: Vec<RefreshWaiter>,
    },
}

impl RefreshState {
    /// Parks `waiter` on the current cycle.
    ///
    /// Returns `true` when this call moved the state out of `Idle`; that caller
    /// owns starting the refresh. Everyone else just waits.
    pub fn join(&mut self, waiter: RefreshWaiter) -> bool {
        match self {
            RefreshState::Idle => {
                *self = RefreshState::Refreshing {
                    waiters: vec![waiter],
                };
                true
            }
            RefreshState::Refreshing { waiters } => {
                waiters.push(waiter);
                false
            }
        }
    }

    /// Ends the cycle: back to `Idle`, handing out everyone who was waiting.
    pub fn settle(&mut self) -> Vec<RefreshWaiter> {
        match std::mem::take(self) {
            RefreshState::Idle => Vec::new(),
            RefreshState::Refreshing { waiters } => waiters,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self, RefreshState::Refreshing { .. })
    }

    pub fn waiter_count(&self) -> usize {
        match self {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }
}
