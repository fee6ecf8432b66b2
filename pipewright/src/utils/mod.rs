//! Utility functions for timestamps and log text hygiene.

pub mod timestamps;
mod text;

pub use text::{conceal, sanitize, strip_ansi, CONCEALMENT};
pub use timestamps::{epoch_millis, from_epoch_millis, Timestamp};
