//! Parser for the portal's grades listing page.
//!
//! The page is not well-formed enough to justify a DOM parser, and only a
//! handful of fixed markup shapes carry data, so extraction is a linear scan
//! in two stages:
//!
//! 1. [`GradeHtmlParser::split_subjects`] cuts the document into one span per
//!    subject header.
//! 2. [`GradeHtmlParser::extract_rows`] pulls dated grades out of a single
//!    span, row by row.
//!
//! Rows without a date or a numeric grade (absences, notes, blank cells) are
//! expected and skipped without error.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, trace};

use crate::models::{GradeRecord, ParseResult};

/// Opening markup of the cell that carries a subject name.
const SUBJECT_OPEN: &str = r#"<td colspan="48" class="registro redtext open_sans_condensed_bold font_size_20" align="center" style="padding:20px;" >"#;
const SUBJECT_CLOSE: &str = "</td>";

/// Opening markup of the span that carries a grade's date.
const DATE_OPEN: &str = r#"<span class="voto_data cella_data font_size_11" style="">"#;
const DATE_CLOSE: &str = "</span>";

/// Opening markup of the paragraph that carries the grade itself.
const GRADE_OPEN: &str = r#"<p align="center" class="s_reg_testo cella_trattino" style="height:40px; line-height:40px; border:0; margin:0; padding:0;font-weight:bold; font-size:22px;">"#;
const GRADE_CLOSE: &str = "</p>";

/// Date format used by the portal (`DD/MM/YYYY`).
const DATE_FORMAT: &str = "%d/%m/%Y";

fn subject_regex() -> &'static Regex {
    static SUBJECT_RE: OnceLock<Regex> = OnceLock::new();
    SUBJECT_RE.get_or_init(|| {
        let pattern = format!(
            r"{}\s*([^<]+?)\s*{}",
            regex::escape(SUBJECT_OPEN),
            regex::escape(SUBJECT_CLOSE)
        );
        Regex::new(&pattern).expect("subject header pattern is valid")
    })
}

/// Non-greedy so a match never spans two rows.
fn row_regex() -> &'static Regex {
    static ROW_RE: OnceLock<Regex> = OnceLock::new();
    ROW_RE.get_or_init(|| Regex::new(r"(?s)<tr.*?>(.*?)</tr>").expect("row pattern is valid"))
}

fn date_regex() -> &'static Regex {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    DATE_RE.get_or_init(|| {
        let pattern = format!(
            r"{}([0-9]{{2}}/[0-9]{{2}}/[0-9]{{4}}){}",
            regex::escape(DATE_OPEN),
            regex::escape(DATE_CLOSE)
        );
        Regex::new(&pattern).expect("date cell pattern is valid")
    })
}

fn grade_regex() -> &'static Regex {
    static GRADE_RE: OnceLock<Regex> = OnceLock::new();
    GRADE_RE.get_or_init(|| {
        let pattern = format!(
            r"{}\s*([^<]+?)\s*{}",
            regex::escape(GRADE_OPEN),
            regex::escape(GRADE_CLOSE)
        );
        Regex::new(&pattern).expect("grade cell pattern is valid")
    })
}

/// The slice of a document belonging to one subject header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSpan<'a> {
    /// Trimmed subject name from the header cell.
    pub name: String,
    /// Byte offset of the header in the document.
    pub offset: usize,
    /// Text between the end of this header and the start of the next one.
    pub body: &'a str,
}

/// Parser for the grades listing page.
pub struct GradeHtmlParser;

impl GradeHtmlParser {
    /// Parse a whole document into grades per subject.
    ///
    /// Never fails: a page without subject headers gives an empty map. When
    /// a subject name appears more than once, the last block that produced
    /// grades wins.
    pub fn parse(document: &str) -> ParseResult {
        let mut result = ParseResult::new();

        for span in Self::split_subjects(document) {
            let mut records = Self::extract_rows(span.body);
            if records.is_empty() {
                trace!(subject = %span.name, "Subject has no grades, skipping");
                continue;
            }

            // sort_by is stable: grades on the same day keep page order
            records.sort_by(|a, b| a.date.cmp(&b.date));

            if result.insert(span.name.clone(), records).is_some() {
                debug!(subject = %span.name, "Duplicate subject block replaced earlier one");
            }
        }

        debug!(subjects = result.len(), bytes = document.len(), "Parsed grades document");
        result
    }

    /// Stage 1: split the document into subject spans, in document order.
    ///
    /// Headers whose name trims to nothing still end the previous span but
    /// produce no span of their own.
    pub fn split_subjects(document: &str) -> Vec<SubjectSpan<'_>> {
        let headers: Vec<_> = subject_regex().captures_iter(document).collect();
        let mut spans = Vec::with_capacity(headers.len());

        for (i, cap) in headers.iter().enumerate() {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };

            let name = name.as_str().trim();
            if name.is_empty() {
                continue;
            }

            let end = headers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(document.len());

            spans.push(SubjectSpan {
                name: name.to_string(),
                offset: whole.start(),
                body: &document[whole.end()..end],
            });
        }

        spans
    }

    /// Stage 2: extract grades from one subject span, in row order.
    pub fn extract_rows(span: &str) -> Vec<GradeRecord> {
        row_regex()
            .captures_iter(span)
            .filter_map(|cap| cap.get(1))
            .filter_map(|row| Self::parse_row(row.as_str()))
            .collect()
    }

    /// Extract a grade from the inner markup of one table row.
    ///
    /// Both the date cell and the grade cell must be present and valid.
    pub fn parse_row(row: &str) -> Option<GradeRecord> {
        let date_text = date_regex().captures(row)?.get(1)?.as_str();
        let grade_text = grade_regex().captures(row)?.get(1)?.as_str();

        let date = NaiveDate::parse_from_str(date_text, DATE_FORMAT).ok()?;
        let value = parse_grade_value(grade_text)?;

        Some(GradeRecord::new(date, value))
    }
}

/// Parse a grade cell's text, accepting a comma as decimal separator.
///
/// Returns `None` for anything that is not a finite number.
pub fn parse_grade_value(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
