//! tracklog wire types.
//!
//! Shared by the server and its clients.
//!
//! # Modules
//!
//! - [`frame`] - Text frames of the real-time channel and their codec
//! - [`dto`] - JSON bodies of the HTTP API
//! - [`response`] - The error body returned by every HTTP failure
//! - [`validation`] - Field checks for incoming bodies
//! - [`error`] - Protocol error types

pub mod dto;
pub mod error;
pub mod frame;
pub mod response;
pub mod validation;

pub use error::Error;

// Re-export commonly used types at crate root
pub use dto::{
    ActivityRequest, ActivityResponse, AuthRequest, AuthResponse, Page, RegisterRequest, RoleName,
};
pub use frame::{headers, Command, Frame, STOMP_VERSION};
pub use response::ErrorResponse;
pub use validation::{FieldErrors, Validate};

/// Topic every activity is broadcast on.
pub const ACTIVITY_TOPIC: &str = "/topic/activities";

/// Application destination for logging an activity over the channel.
pub const ACTIVITY_SEND_DESTINATION: &str = "/app/activities";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destinations() {
        assert!(ACTIVITY_TOPIC.starts_with("/topic/"));
        assert!(ACTIVITY_SEND_DESTINATION.starts_with("/app/"));
    }
}
