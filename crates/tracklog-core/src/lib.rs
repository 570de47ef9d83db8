//! Authentication core for tracklog.
//!
//! Every gate of the service (HTTP requests, connection handshakes and
//! logical-session frames) turns a credential into an identity through the
//! same path:
//!
//! 1. [`TokenCodec::parse_and_verify`] checks the signature and decodes claims
//! 2. [`token::check_expiry`] rejects tokens whose expiry is not after `now`
//! 3. [`IdentityResolver::resolve`] loads the subject from the
//!    [`UserDirectory`] under a timeout
//!
//! [`TokenAuthenticator`] bundles the three steps and reports an
//! [`AuthenticationOutcome`]. Identities are returned to the caller and never
//! parked in shared state.
//!
//! # Example
//!
//! ```ignore
//! use tracklog_core::{IdentityResolver, StaticDirectory, TokenAuthenticator, TokenCodec};
//!
//! let codec = Arc::new(TokenCodec::from_base64_secret(&secret, lifetime)?);
//! let resolver = IdentityResolver::new(Arc::new(StaticDirectory::new()));
//! let auth = TokenAuthenticator::new(codec, resolver);
//!
//! match auth.authenticate(token, clock.now()).await {
//!     AuthenticationOutcome::Authenticated(identity) => { /* bind it */ }
//!     AuthenticationOutcome::Rejected(reason) => { /* refuse */ }
//! }
//! ```

pub mod authenticator;
pub mod clock;
pub mod directory;
pub mod error;
pub mod identity;
pub mod resolver;
pub mod token;

pub use authenticator::{extract_bearer, AuthenticationOutcome, TokenAuthenticator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{StaticDirectory, UserDirectory};
pub use error::{DirectoryError, IssueError, KeyError, TokenError};
pub use identity::{Identity, Role};
pub use resolver::IdentityResolver;
pub use token::{Claims, Token, TokenCodec};
