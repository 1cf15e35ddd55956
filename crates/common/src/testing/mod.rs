//! Testing utilities and helpers
//!
//! - **[`time`]**: clock abstraction with a controllable mock
//! - **[`mocks`]**: scripted token issuer for credential tests

#[cfg(feature = "platform")]
pub mod mocks;
pub mod time;

#[cfg(feature = "platform")]
pub use mocks::MockTokenIssuer;
pub use time::{Clock, MockClock, SystemClock};
