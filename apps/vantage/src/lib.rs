//! Vantage application library.
//!
//! Exposes the HTTP API and CLI modules so integration tests can build
//! routers and invoke commands without spawning the binary.

pub mod api;
pub mod cli;
