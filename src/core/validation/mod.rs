//! Request validation and input normalisation
//!
//! Request bodies derive `validator::Validate` and are extracted through
//! [`ValidatedJson`], so handlers only ever see input that passed its rules.
//! Path and query parameters go through the [`Path`] and [`Query`] wrappers so
//! malformed URLs get the same error body.
//! The [`filters`] normalise free text before it is stored.

pub mod extractor;
pub mod filters;
pub mod validators;

pub use extractor::{Path, Query, ValidatedJson};
