//! `zonecast-runtime` library crate.
//!
//! Re-exports the runtime modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod console;
pub mod driver;
pub mod timers;
