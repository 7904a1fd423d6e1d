pub mod fedex;

use anyhow::Result;
use fedex::TrackResponse;
use std::time::{Duration, Instant};

/// Tokens are treated as expired this long before the carrier says they are.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// An authenticated carrier session. Owned by whoever runs the report and
/// handed to every batch call; nothing re-authenticates behind its back.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
    expires_at: Instant,
}

impl Session {
    pub fn new(access_token: String, expires_in: Duration) -> Self {
        Self {
            access_token,
            expires_at: Instant::now() + expires_in.saturating_sub(EXPIRY_MARGIN),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

pub trait CourierClient: Send + Sync {
    /// Exchange credentials for a fresh session.
    fn authenticate(&self) -> Result<Session>;

    /// Track up to one request's worth of tracking numbers.
    fn track_batch(&self, session: &Session, tracking_numbers: &[String]) -> Result<TrackResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_within_margin_is_expired() {
        let session = Session::new("token".into(), Duration::from_secs(30));
        assert!(session.is_expired());
    }

    #[test]
    fn fresh_session_is_usable() {
        let session = Session::new("token".into(), Duration::from_secs(3600));
        assert!(!session.is_expired());
        assert_eq!(session.access_token(), "token");
    }
}
