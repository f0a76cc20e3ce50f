//! Domain models for grades extracted from the portal.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::solver::{self, Unsolvable};

/// Lowest grade the portal scale can display.
pub const MIN_GRADE: f64 = 1.0;

/// Highest grade the portal scale can display.
pub const MAX_GRADE: f64 = 10.0;

/// A single dated grade.
///
/// `value` is the number as parsed from the document. It is not clamped to
/// the displayable range; use [`GradeRecord::display_value`] for that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub date: NaiveDate,
    pub value: f64,
}

impl GradeRecord {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }

    /// Value clamped to the 1-10 scale, for charts and lists.
    pub fn display_value(&self) -> f64 {
        self.value.clamp(MIN_GRADE, MAX_GRADE)
    }

    /// Whether this grade reaches the given pass mark.
    pub fn is_passing(&self, target: f64) -> bool {
        self.value >= target
    }
}

/// Grades keyed by subject name, each list sorted ascending by date.
///
/// Subjects with no grades never appear in the map.
pub type ParseResult = BTreeMap<String, Vec<GradeRecord>>;

/// Per-subject figures derived from a parse result.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSummary {
    pub subject: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub last: Option<GradeRecord>,
    pub needed: Result<f64, Unsolvable>,
}

impl SubjectSummary {
    pub fn from_records(subject: &str, records: &[GradeRecord], target: f64) -> Self {
        let values: Vec<f64> = records.iter().map(|r| r.value).collect();
        let mean = if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        };

        Self {
            subject: subject.to_string(),
            count: values.len(),
            mean,
            last: records.last().copied(),
            needed: solver::required_next(&values, target),
        }
    }

    /// Build summaries for every subject in a parse result, in subject order.
    pub fn summarize(result: &ParseResult, target: f64) -> Vec<Self> {
        result
            .iter()
            .map(|(subject, records)| Self::from_records(subject, records, target))
            .collect()
    }

    /// Whether the current mean is at or above the target.
    pub fn is_passing(&self, target: f64) -> bool {
        self.mean.map(|m| m >= target).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32, m: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_display_value_clamps() {
        assert_eq!(GradeRecord::new(date(1, 10, 2024), 0.5).display_value(), 1.0);
        assert_eq!(GradeRecord::new(date(1, 10, 2024), 11.0).display_value(), 10.0);
        assert_eq!(GradeRecord::new(date(1, 10, 2024), 7.25).display_value(), 7.25);
    }

    #[test]
    fn test_summary_from_records() {
        let records = vec![
            GradeRecord::new(date(1, 10, 2024), 7.0),
            GradeRecord::new(date(8, 10, 2024), 8.0),
        ];
        let summary = SubjectSummary::from_records("MATEMATICA", &records, 6.0);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, Some(7.5));
        assert_eq!(summary.last, Some(records[1]));
        assert_eq!(summary.needed, Ok(3.0));
        assert!(summary.is_passing(6.0));
    }

    #[test]
    fn test_summarize_keeps_subject_order() {
        let mut result = ParseResult::new();
        result.insert("STORIA".to_string(), vec![GradeRecord::new(date(2, 2, 2025), 5.0)]);
        result.insert("ARTE".to_string(), vec![GradeRecord::new(date(3, 2, 2025), 9.0)]);

        let summaries = SubjectSummary::summarize(&result, 6.0);
        let names: Vec<&str> = summaries.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(names, vec!["ARTE", "STORIA"]);
        assert!(!summaries[1].is_passing(6.0));
        assert_eq!(summaries[1].needed, Ok(7.0));
    }
}
