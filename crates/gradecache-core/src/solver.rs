//! Grade-needed solver.
//!
//! Given the grades a student already has in a subject, computes the grade
//! the next entry must carry for the arithmetic mean to land exactly on the
//! target. The result is deliberately not clamped to the 1-10 scale: a value
//! above 10 means the target is out of reach with a single grade, and a value
//! below 1 means it is already secured.

use thiserror::Error;

/// Pass mark used when the caller does not configure one.
pub const DEFAULT_TARGET: f64 = 6.0;

/// Prefix shown in front of a computed grade.
const DISPLAY_PREFIX: &str = "Voto: ";

/// Shown when the needed grade cannot be computed.
const UNSOLVABLE_MESSAGE: &str = "Impossibile calcolare";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot compute the grade needed for the target average")]
pub struct Unsolvable;

/// Grade needed on the next entry so that the mean of `values` plus that
/// entry equals `target`.
///
/// `x = target * (n + 1) - sum(values)`. With no prior grades the answer is
/// the target itself.
pub fn required_next(values: &[f64], target: f64) -> Result<f64, Unsolvable> {
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let needed = target * (n + 1.0) - sum;

    if needed.is_finite() {
        Ok(needed)
    } else {
        Err(Unsolvable)
    }
}

/// Format a grade with two decimals, dropping a trailing `.00`.
///
/// `6.0` renders as `"6"`, `6.5` as `"6.50"`.
pub fn format_grade(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    match formatted.strip_suffix(".00") {
        Some(whole) if whole == "-0" => "0".to_string(),
        Some(whole) => whole.to_string(),
        None => formatted,
    }
}

/// User-facing line for a solver outcome, e.g. `"Voto: 3"`.
pub fn display_needed(outcome: Result<f64, Unsolvable>) -> String {
    match outcome {
        Ok(value) => format!("{}{}", DISPLAY_PREFIX, format_grade(value)),
        Err(_) => UNSOLVABLE_MESSAGE.to_string(),
    }
}
