//! Utility types shared across Warden crates.

pub mod logging;

pub use logging::LogLevel;
