//! View models and form controllers for the election results
//! reporting frontends.
//!
//! Everything in this crate is pure state: views are computed from an
//! election definition and a results snapshot, and the form/upload
//! controllers are explicit state machines driven by the caller. No
//! module here performs I/O; fetching and submitting stay with the
//! embedding frontend, which feeds responses back in.

pub mod data_table;
pub mod entry_form;
pub mod results_view;
pub mod upload;
pub mod validation;
