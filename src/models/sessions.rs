use std::time::{Duration, Instant};

use crate::models::members::Member;

/// How long the "just updated" acknowledgment stays visible after a weight
/// update.
pub const ACK_WINDOW: Duration = Duration::from_secs(2);

/// Admin access marker. Set exactly once per successful credential exchange,
/// cleared exactly once per logout; never re-validated against the backend
/// within a session.
#[derive(Clone, Debug, Default)]
pub struct AdminSession {
    authenticated: bool,
}

impl AdminSession {
    pub fn login(&mut self) {
        self.authenticated = true;
    }

    pub fn logout(&mut self) {
        self.authenticated = false;
    }

    pub fn is_authorized(&self) -> bool {
        self.authenticated
    }
}

/// Transient self-service context established by mobile lookup.
#[derive(Clone, Debug, Default)]
pub struct MemberSession {
    member: Option<Member>,
    acknowledged_until: Option<Instant>,
}

impl MemberSession {
    pub fn login(&mut self, member: Member) {
        self.member = Some(member);
        self.acknowledged_until = None;
    }

    pub fn logout(&mut self) {
        self.member = None;
        self.acknowledged_until = None;
    }

    pub fn member(&self) -> Option<&Member> {
        self.member.as_ref()
    }

    pub fn replace_member(&mut self, member: Member) {
        self.member = Some(member);
    }

    /// Opens the acknowledgment window; does not block further edits.
    pub fn mark_updated(&mut self) {
        self.acknowledged_until = Some(Instant::now() + ACK_WINDOW);
    }

    pub fn just_updated(&self) -> bool {
        self.acknowledged_until
            .map(|until| Instant::now() < until)
            .unwrap_or(false)
    }
}
