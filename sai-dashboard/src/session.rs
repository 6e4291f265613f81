//! Connection and authorization state

use sai_core::dto::inbound::AuthFields;
use tracing::{debug, info};

use crate::DashboardConfig;
use crate::timers::{TimerHandle, TimerKind, Timers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No frame has said anything about authorization yet
    Unknown,
    Unauthorized,
    Authorized {
        user: String,
        /// Unix milliseconds the login runs out at, if the server said
        expires_at_ms: Option<i64>,
    },
}

/// One connection attempt and the login state carried across attempts
#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    auth: AuthState,
    reconnect_ms: u64,
    reconnect_timer: Option<TimerHandle>,
    expiry_timer: Option<TimerHandle>,
}

impl Session {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            state: ConnectionState::Connecting,
            auth: AuthState::Unknown,
            reconnect_ms: config.reconnect_ms,
            reconnect_timer: None,
            expiry_timer: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self.auth, AuthState::Authorized { .. })
    }

    pub fn user(&self) -> Option<&str> {
        match &self.auth {
            AuthState::Authorized { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// A connection came up; any reconnect still scheduled is moot
    pub fn opened(&mut self, timers: &mut Timers) {
        info!("dashboard connection open");
        self.state = ConnectionState::Open;
        if let Some(handle) = self.reconnect_timer.take() {
            timers.cancel(handle);
        }
    }

    /// The connection dropped; arms the fixed-delay reconnect
    pub fn closed(&mut self, timers: &mut Timers, now_ms: i64) {
        if self.state == ConnectionState::Closed {
            return;
        }
        info!(
            "dashboard connection closed, reconnecting in {}ms",
            self.reconnect_ms
        );
        self.state = ConnectionState::Closed;
        if let Some(handle) = self.reconnect_timer.take() {
            timers.cancel(handle);
        }
        self.reconnect_timer = Some(timers.schedule(
            TimerKind::Reconnect,
            now_ms + self.reconnect_ms as i64,
        ));
    }

    /// The reconnect timer fired
    pub fn reconnect_due(&mut self) {
        self.reconnect_timer = None;
        self.state = ConnectionState::Connecting;
    }

    /// Folds the auth fields of an overview or task frame in
    ///
    /// Fresh expiry data cancels the previous expiry timer before arming a
    /// new one. Returns true if anything was present to apply.
    pub fn apply_auth(&mut self, auth: &AuthFields, timers: &mut Timers, now_ms: i64) -> bool {
        match auth.authorized {
            None => false,
            Some(false) => {
                self.auth = AuthState::Unauthorized;
                if let Some(handle) = self.expiry_timer.take() {
                    timers.cancel(handle);
                }
                true
            }
            Some(true) => {
                let user = auth
                    .auth_user
                    .clone()
                    .or_else(|| self.user().map(str::to_string))
                    .unwrap_or_default();
                let mut expires_at_ms = match &self.auth {
                    AuthState::Authorized { expires_at_ms, .. } => *expires_at_ms,
                    _ => None,
                };
                if let Some(secs) = auth.auth_secs.filter(|s| *s > 0) {
                    if let Some(handle) = self.expiry_timer.take() {
                        timers.cancel(handle);
                    }
                    // Too far out to represent: the login never expires
                    let due = i64::try_from(secs)
                        .ok()
                        .and_then(|s| s.checked_mul(1_000))
                        .and_then(|ms| now_ms.checked_add(ms));
                    match due {
                        Some(due) => {
                            self.expiry_timer =
                                Some(timers.schedule(TimerKind::SessionExpiry, due));
                            debug!("login for {} expires in {}s", user, secs);
                        }
                        None => debug!("login for {} claims {}s, not expiring", user, secs),
                    }
                    expires_at_ms = due;
                }
                self.auth = AuthState::Authorized {
                    user,
                    expires_at_ms,
                };
                true
            }
        }
    }

    pub fn expiry_timer(&self) -> Option<TimerHandle> {
        self.expiry_timer
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorized(user: Option<&str>, secs: Option<u64>) -> AuthFields {
        AuthFields {
            authorized: Some(true),
            auth_user: user.map(str::to_string),
            auth_secs: secs,
        }
    }

    #[test]
    fn test_expiry_rearm_replaces_previous_timer() {
        let mut timers = Timers::new();
        let mut session = Session::new(&DashboardConfig::default());

        session.apply_auth(&authorized(Some("andy"), Some(60)), &mut timers, 0);
        let first = session.expiry_timer().unwrap();
        session.apply_auth(&authorized(None, Some(120)), &mut timers, 10_000);
        let second = session.expiry_timer().unwrap();

        assert!(!timers.is_pending(first));
        assert_eq!(timers.due_of(second), Some(130_000));
        assert_eq!(timers.pending_of(TimerKind::SessionExpiry), 1);
        assert_eq!(session.user(), Some("andy"));
    }

    #[test]
    fn test_deauthorization_drops_expiry() {
        let mut timers = Timers::new();
        let mut session = Session::new(&DashboardConfig::default());
        session.apply_auth(&authorized(Some("andy"), Some(60)), &mut timers, 0);

        let denied = AuthFields {
            authorized: Some(false),
            ..Default::default()
        };
        assert!(session.apply_auth(&denied, &mut timers, 1));
        assert_eq!(session.auth(), &AuthState::Unauthorized);
        assert!(timers.is_empty());
        assert!(!session.apply_auth(&AuthFields::default(), &mut timers, 2));
    }

    #[test]
    fn test_close_arms_single_reconnect() {
        let mut timers = Timers::new();
        let mut session = Session::new(&DashboardConfig::default());
        session.opened(&mut timers);

        session.closed(&mut timers, 1_000);
        session.closed(&mut timers, 2_000);

        assert_eq!(timers.pending_of(TimerKind::Reconnect), 1);
        assert_eq!(timers.next_deadline(), Some(5_000));

        session.opened(&mut timers);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_overflowing_expiry_is_dropped() {
        let mut timers = Timers::new();
        let mut session = Session::new(&DashboardConfig::default());
        session.apply_auth(&authorized(Some("andy"), Some(60)), &mut timers, 0);

        session.apply_auth(&authorized(None, Some(u64::MAX)), &mut timers, 1_000);
        assert!(session.expiry_timer().is_none());
        assert!(timers.is_empty());
        assert_eq!(
            session.auth(),
            &AuthState::Authorized {
                user: "andy".into(),
                expires_at_ms: None,
            }
        );

        session.apply_auth(
            &authorized(None, Some(9_223_372_036_854_775)),
            &mut timers,
            1_700_000_000_000,
        );
        assert!(timers.is_empty());
    }
}
