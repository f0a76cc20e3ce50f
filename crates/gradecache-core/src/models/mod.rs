//! Data models for portal grade data.
//!
//! This module contains the structures produced by the scrape pipeline:
//!
//! - `GradeRecord`: a single dated grade for a subject
//! - `ParseResult`: subject name to chronologically sorted grades
//! - `SubjectSummary`: per-subject view used by display code

pub mod grade;

pub use grade::{GradeRecord, ParseResult, SubjectSummary};
