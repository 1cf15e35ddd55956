//! External service integrations

pub mod intake;
