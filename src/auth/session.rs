//! Authenticated Session Snapshot
//!
//! A [`Session`] is an immutable record of one successful login. The real
//! credential lives in the transport's cookie jar; the session's `id` is a
//! sentinel confirming that cookie-based authentication took place. Sessions
//! are created exclusively by the auth manager, shared read-only behind an
//! `Arc`, and replaced wholesale on refresh; they are never mutated.

use chrono::{DateTime, Duration, Utc};

/// Sentinel identity recorded for cookie-based sessions.
pub const COOKIE_SESSION_ID: &str = "authenticated";

/// Remaining lifetime below which a session is considered due for refresh.
const REFRESH_THRESHOLD_MINUTES: i64 = 10;

/// An immutable snapshot of an authenticated controller session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session identity; [`COOKIE_SESSION_ID`] for cookie auth.
    pub id: String,
    /// CSRF token issued with this session (may be empty on some firmwares).
    pub csrf_token: String,
    /// Username the session was established for.
    pub username: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires, if known.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Builds a session snapshot for a completed login.
    pub fn new(
        id: impl Into<String>,
        csrf_token: impl Into<String>,
        username: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            csrf_token: csrf_token.into(),
            username: username.into(),
            created_at,
            expires_at,
        }
    }

    /// True when the session can still be used: a non-empty identity and an
    /// expiry that is either unset or in the future.
    pub fn is_valid(&self) -> bool {
        if self.id.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > Utc::now(),
            None => true,
        }
    }

    /// True when the expiry is set and within ten minutes of now.
    ///
    /// Sessions without a known expiry never report needing refresh; an
    /// already-expired session does (and additionally fails `is_valid`).
    pub fn needs_refresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                expires_at - Utc::now() <= Duration::minutes(REFRESH_THRESHOLD_MINUTES)
            }
            None => false,
        }
    }

    /// Elapsed time since creation, or zero if that lies in the future.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at).max(Duration::zero())
    }

    /// Remaining lifetime, or zero when the expiry is unset or passed.
    pub fn time_until_expiry(&self) -> Duration {
        match self.expires_at {
            Some(expires_at) => (expires_at - Utc::now()).max(Duration::zero()),
            None => Duration::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_in(minutes: i64) -> Session {
        let now = Utc::now();
        Session::new(
            COOKIE_SESSION_ID,
            "tok",
            "admin",
            now,
            Some(now + Duration::minutes(minutes)),
        )
    }

    #[test]
    fn valid_requires_identity_and_future_expiry() {
        assert!(session_expiring_in(60).is_valid());

        let no_expiry = Session::new(COOKIE_SESSION_ID, "tok", "admin", Utc::now(), None);
        assert!(no_expiry.is_valid());

        let empty_id = Session::new("", "tok", "admin", Utc::now(), None);
        assert!(!empty_id.is_valid());

        assert!(!session_expiring_in(-1).is_valid());
    }

    #[test]
    fn needs_refresh_tracks_the_ten_minute_threshold() {
        assert!(!session_expiring_in(60).needs_refresh());
        assert!(session_expiring_in(9).needs_refresh());
        assert!(session_expiring_in(-5).needs_refresh());

        let no_expiry = Session::new(COOKIE_SESSION_ID, "tok", "admin", Utc::now(), None);
        assert!(!no_expiry.needs_refresh());
    }

    #[test]
    fn durations_clamp_to_zero() {
        let session = session_expiring_in(-5);
        assert_eq!(session.time_until_expiry(), Duration::zero());

        let no_expiry = Session::new(COOKIE_SESSION_ID, "tok", "admin", Utc::now(), None);
        assert_eq!(no_expiry.time_until_expiry(), Duration::zero());
        assert!(no_expiry.age() >= Duration::zero());
    }
}
