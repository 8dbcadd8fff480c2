//! Per-conference reporting identity.

use common::types::ConferenceId;
use std::sync::OnceLock;

/// Identity of one reported conference.
///
/// The conference id and local user id are fixed at construction. The
/// backend session id is published at most once, when setup succeeds, and
/// is visible to every thread afterwards.
#[derive(Debug)]
pub struct ConferenceContext {
    conference_id: ConferenceId,
    local_user_id: String,
    session_id: OnceLock<String>,
}

impl ConferenceContext {
    #[must_use]
    pub fn new(conference_id: ConferenceId, local_user_id: impl Into<String>) -> Self {
        Self {
            conference_id,
            local_user_id: local_user_id.into(),
            session_id: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn conference_id(&self) -> &ConferenceId {
        &self.conference_id
    }

    #[must_use]
    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    /// Backend session id, once assigned.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.get().map(String::as_str)
    }

    /// Publish the session id. Returns `false` if one was already set; the
    /// first value is kept.
    pub fn assign_session_id(&self, session_id: String) -> bool {
        self.session_id.set(session_id).is_ok()
    }
}
