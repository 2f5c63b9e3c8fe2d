//! Bubbles relay library.
//!
//! This module exposes the relay components for use in tests and binaries.

pub mod config;
pub mod relay;
pub mod state;
pub mod ws;
