//! `colmatch-engine`: cross-file column matcher and annotator.
//!
//! Pure engine crate: documents come in through the [`document`] traits, matches
//! and marks go out. No file-format code lives here.

pub mod address;
pub mod compare;
pub mod document;
pub mod error;
pub mod matcher;
pub mod options;
pub mod report;
pub mod request;
pub mod status;
pub mod style;

#[cfg(test)]
pub mod harness;

pub use compare::{compare, compare_status};
pub use document::{Annotatable, DocumentOpener, StyleId, TabularDocument};
pub use error::{CompareError, Side};
pub use options::{CompareOptions, MarkMode, MissingColumnPolicy};
pub use report::MatchReport;
pub use request::ComparisonRequest;
pub use status::StatusHolder;
pub use style::{HighlightStyle, Rgb};
