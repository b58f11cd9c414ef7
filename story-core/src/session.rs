//! Explicit identity for operations that act on an author's stories.
//!
//! An [`AuthSession`] is created when the auth layer logs someone in and is
//! consumed on logout. Every studio operation that needs to know who is
//! asking takes one by reference; nothing reads identity from global state.

use crate::record::AuthorId;
use chrono::{DateTime, Utc};
use tracing::info;

/// An authenticated author for the lifetime of a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    author: AuthorId,
    display_name: Option<String>,
    started_at: DateTime<Utc>,
}

impl AuthSession {
    /// Start a session for an author the auth layer has already verified.
    pub fn login(author: AuthorId) -> Self {
        info!(author_id = %author, "Session started");
        Self {
            author,
            display_name: None,
            started_at: Utc::now(),
        }
    }

    /// Attach a display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn author(&self) -> &AuthorId {
        &self.author
    }

    /// Display name, falling back to the author id.
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.author.as_str())
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// End the session. The returned id is all that survives.
    pub fn logout(self) -> AuthorId {
        info!(author_id = %self.author, "Session ended");
        self.author
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let before = Utc::now();
        let session = AuthSession::login(AuthorId::new("alice"));
        assert_eq!(session.author().as_str(), "alice");
        assert_eq!(session.display_name(), "alice");
        assert!(session.started_at() >= before);

        let author = session.logout();
        assert_eq!(author, AuthorId::new("alice"));
    }

    #[test]
    fn test_display_name() {
        let session = AuthSession::login(AuthorId::new("u-42")).with_display_name("Alice");
        assert_eq!(session.display_name(), "Alice");
    }
}
