//! # Vaultwire Transport
//!
//! The narrow request interface engine clients use to reach the secrets
//! server: read, read with query, write, list and delete on a path.
//!
//! Provides the [`Transport`] trait, the response [`Envelope`], the
//! absent-result policy and the system mount endpoints shared by every
//! engine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod mount;
pub mod transport;

pub use envelope::Envelope;
pub use error::{NotFound, TransportError};
pub use mount::SecretStatus;
pub use transport::{Absent, Transport};
