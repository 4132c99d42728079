//! Shared types for the election results reporting system.
//!
//! Everything here mirrors the wire format of the reporting API:
//! field names serialize as camelCase, timestamps are UTC and
//! serialize as RFC 3339 strings.

pub mod election;
pub mod file;
pub mod results;
pub(crate) mod util;
