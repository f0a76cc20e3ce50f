//! Manual grade ledger.
//!
//! A fixed row of slots where the user types grades the portal does not
//! show yet. Grades fill the slot after the last filled one; removing takes
//! the last filled slot back out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::grade::{MAX_GRADE, MIN_GRADE};
use crate::solver::{self, Unsolvable};

/// Number of slots in a ledger.
pub const LEDGER_SLOTS: usize = 20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid grade: {0:?}")]
    InvalidValue(String),

    #[error("Ledger is full - no free slot left")]
    Full,

    #[error("No grade to remove")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Option<f64>>", into = "Vec<Option<f64>>")]
pub struct GradeLedger {
    slots: [Option<f64>; LEDGER_SLOTS],
}

impl Default for GradeLedger {
    fn default() -> Self {
        Self {
            slots: [None; LEDGER_SLOTS],
        }
    }
}

impl GradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grade after the last filled slot, clamped to the 1-10 scale.
    /// Returns the slot index used.
    pub fn push(&mut self, value: f64) -> Result<usize, LedgerError> {
        if !value.is_finite() {
            return Err(LedgerError::InvalidValue(value.to_string()));
        }

        let next = self.last_filled().map(|i| i + 1).unwrap_or(0);
        if next >= LEDGER_SLOTS {
            return Err(LedgerError::Full);
        }

        self.slots[next] = Some(value.clamp(MIN_GRADE, MAX_GRADE));
        Ok(next)
    }

    /// Parse user input (`"7"`, `"7.5"`, `" 7,5 "`) and push it.
    pub fn push_input(&mut self, input: &str) -> Result<usize, LedgerError> {
        let cleaned = input.trim().replace(',', ".");
        let value = cleaned
            .parse::<f64>()
            .map_err(|_| LedgerError::InvalidValue(input.to_string()))?;
        self.push(value)
    }

    /// Remove the last filled slot and return its value.
    pub fn pop(&mut self) -> Result<f64, LedgerError> {
        let index = self.last_filled().ok_or(LedgerError::Empty)?;
        self.slots[index].take().ok_or(LedgerError::Empty)
    }

    /// Filled slots, in slot order.
    pub fn values(&self) -> Vec<f64> {
        self.slots.iter().flatten().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.last_filled().is_none()
    }

    pub fn is_full(&self) -> bool {
        self.slots[LEDGER_SLOTS - 1].is_some()
    }

    pub fn slots(&self) -> &[Option<f64>; LEDGER_SLOTS] {
        &self.slots
    }

    /// Grade needed on the next entry to bring the mean to `target`.
    pub fn required_next(&self, target: f64) -> Result<f64, Unsolvable> {
        solver::required_next(&self.values(), target)
    }

    /// Chart points as (`"1°"`, value) pairs, labelled by slot, values clamped.
    pub fn chart_points(&self) -> Vec<(String, f64)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|v| (format!("{}°", i + 1), v.clamp(MIN_GRADE, MAX_GRADE))))
            .collect()
    }

    /// Percentage change from the second-to-last to the last grade.
    ///
    /// Zero with fewer than two grades.
    pub fn trend_percentage(&self) -> f64 {
        let points = self.chart_points();
        match points.as_slice() {
            [.., (_, previous), (_, last)] if *previous != 0.0 => (last - previous) / previous * 100.0,
            _ => 0.0,
        }
    }

    fn last_filled(&self) -> Option<usize> {
        self.slots.iter().rposition(|s| s.is_some())
    }
}

impl From<Vec<Option<f64>>> for GradeLedger {
    /// Extra entries beyond the slot count are ignored, missing ones are empty.
    fn from(values: Vec<Option<f64>>) -> Self {
        let mut ledger = Self::default();
        for (slot, value) in ledger.slots.iter_mut().zip(values) {
            *slot = value;
        }
        ledger
    }
}

impl From<GradeLedger> for Vec<Option<f64>> {
    fn from(ledger: GradeLedger) -> Self {
        ledger.slots.to_vec()
    }
}
