//! Logical-session admission inside an open connection.
//!
//! Every inbound frame passes through [`ChannelSession::pre_send`] in arrival
//! order. Only session-establishment frames (`CONNECT`/`STOMP`) are
//! inspected; everything else is forwarded untouched. A connect frame
//! without a valid `Authorization: Bearer` header is swallowed, so an
//! unauthenticated peer sees no reply at all.
//!
//! ```text
//! Unauthenticated --CONNECT ok--> Authenticated --close--> Closed
//!       ^                              |
//!       +-------- CONNECT rejected ----+
//! ```

use chrono::{DateTime, Utc};
use tracklog_core::{AuthenticationOutcome, Identity, TokenAuthenticator};
use tracklog_proto::{headers, Frame};

/// State of a logical session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Identity),
    Closed,
}

/// Per-connection session gate. Owned by the connection task.
pub struct ChannelSession {
    authenticator: TokenAuthenticator,
    connection_id: String,
    state: SessionState,
}

impl ChannelSession {
    pub fn new(authenticator: TokenAuthenticator, connection_id: impl Into<String>) -> Self {
        Self {
            authenticator,
            connection_id: connection_id.into(),
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Identity bound to the current logical session.
    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Inspect an inbound frame. `None` means the frame is dropped.
    ///
    /// State is only written after resolution finishes, so dropping this
    /// future mid-flight leaves the session as it was.
    pub async fn pre_send(&mut self, frame: Frame, now: DateTime<Utc>) -> Option<Frame> {
        if self.state == SessionState::Closed {
            tracing::debug!(connection_id = %self.connection_id, frame = %frame, "frame after close dropped");
            return None;
        }

        if !frame.command.is_connect() {
            return Some(frame);
        }

        let header = frame
            .header(headers::AUTHORIZATION)
            .or_else(|| frame.header("authorization"));

        let outcome = self.authenticator.authenticate_header(header, now).await;
        match outcome {
            AuthenticationOutcome::Authenticated(identity) => {
                tracing::info!(
                    connection_id = %self.connection_id,
                    subject = %identity.subject,
                    "logical session authenticated"
                );
                self.state = SessionState::Authenticated(identity);
                Some(frame)
            }
            AuthenticationOutcome::Rejected(reason) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    error = %reason,
                    "connect frame dropped"
                );
                self.state = SessionState::Unauthenticated;
                None
            }
        }
    }

    /// Tear down the session, discarding its identity.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}
