//! Authentication gates.
//!
//! Three gates share one [`TokenAuthenticator`](tracklog_core::TokenAuthenticator):
//!
//! - [`request`] - `Authorization: Bearer` on every HTTP request, bypassed for
//!   the account endpoints
//! - [`connection`] - the `/ws` handshake, token from `?token=` or the
//!   `Authorization` header
//! - [`channel`] - the `CONNECT` frame of each logical session inside an open
//!   connection
//!
//! # Failure behaviour
//!
//! | Gate | Rejected token |
//! |------|----------------|
//! | request | 401 JSON body (expiry details for expired tokens) |
//! | connection | 401 before upgrade |
//! | channel | frame silently dropped |

pub mod channel;
pub mod connection;
pub mod request;

pub use channel::{ChannelSession, SessionState};
pub use connection::{
    ConnectionAttributes, ConnectionAuthenticator, ConnectionRequest, USER_ATTRIBUTE,
};
pub use request::{authenticate_request, CurrentUser, RequestAuthenticator};
