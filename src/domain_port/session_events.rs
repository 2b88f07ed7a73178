use crate::domain_model::*;

/// Host notifications fired by the refresh coordinator.
///
/// Both hooks run on the refresh task before waiters are released, so they
/// must not block. Anything slow belongs on another task.
pub trait SessionEvents: Send + Sync {
    /// Fired once per successful refresh cycle.
    fn on_token_refreshed(&self, access_token: &AccessToken);
    /// Fired once per failed refresh cycle, after credentials were cleared.
    fn on_logout(&self);
}

#[derive(Debug, Default)]
pub struct NoopSessionEvents;

impl SessionEvents for NoopSessionEvents {
    fn on_token_refreshed(&self, _access_token: &AccessToken) {}

    fn on_logout(&self) {}
}
