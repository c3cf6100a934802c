//! Session: credential pair, durable storage and the user snapshot

pub mod storage;
pub mod token_store;
pub mod user;

/// What the UI should assume about the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    /// refresh failed; re-authentication required
    Expired,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated => "authenticated",
            SessionState::Expired => "expired",
        }
    }
}
