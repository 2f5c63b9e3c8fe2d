//! Types shared by the bubbles relay and its clients.

pub mod protocol;
pub mod user;
