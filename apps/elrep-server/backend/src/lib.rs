//! Server for the election results reporting system.
//!
//! Election admins configure elections and jurisdictions, jurisdiction
//! admins enter or upload precinct-level results, and the public
//! dashboard reads the tallies back out. Uses Postgres as its database
//! server and SQLx to connect to it.

pub mod activity_log;
pub mod app;
pub mod config;
pub mod db;
pub mod log;
pub mod processing;
