//! Field normalization.
//!
//! Turns raw survey strings into numeric-or-missing values.
//!
//! Design goals:
//! - **Tolerant**: a garbage cell becomes `None`, never an error and never zero
//! - **Locale-proof weights**: `IPONDL` used a decimal comma in the earliest
//!   extracts; the comma fix is applied to every year since it is a no-op on
//!   dot-formatted values
//! - **Countable**: every unparsable cell is tallied so drops are observable

use std::borrow::Cow;

use crate::domain::{FieldCounts, SurveyRow};
use crate::io::source::RawRow;

/// Normalized table: one `SurveyRow` per raw row, plus unparsable-cell counts.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTable {
    pub rows: Vec<SurveyRow>,
    pub unparsable: FieldCounts,
}

impl NormalizedTable {
    /// Normalize one raw row and append it.
    pub fn push(&mut self, raw: &RawRow<'_>) {
        let row = normalize_row(raw);
        self.unparsable.fuel_code += usize::from(row.fuel_code.is_none());
        self.unparsable.dwelling_type += usize::from(row.dwelling_type.is_none());
        self.unparsable.move_in_year += usize::from(row.move_in_year.is_none());
        self.unparsable.weight += usize::from(row.weight.is_none());
        self.rows.push(row);
    }
}

pub fn normalize_row(raw: &RawRow<'_>) -> SurveyRow {
    SurveyRow {
        fuel_code: parse_code(&raw.fuel_code),
        dwelling_type: parse_code(&raw.dwelling_type),
        move_in_year: parse_year(&raw.move_in_year),
        weight: parse_weight(&raw.weight),
    }
}

/// Replace every decimal comma by a dot (`"12,5"` → `"12.5"`).
pub fn normalize_decimal_comma(raw: &str) -> Cow<'_, str> {
    if raw.contains(',') {
        Cow::Owned(raw.replace(',', "."))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Parse a sampling weight, accepting both decimal separators.
pub fn parse_weight(raw: &str) -> Option<f64> {
    parse_number(&normalize_decimal_comma(raw))
}

/// Parse a small categorical code (`CMBL`, `TYPL`).
pub fn parse_code(raw: &str) -> Option<u8> {
    let v = parse_integral(raw)?;
    u8::try_from(v).ok()
}

/// Parse a move-in year. Implausible years are kept; only non-numbers are dropped.
pub fn parse_year(raw: &str) -> Option<i32> {
    let v = parse_integral(raw)?;
    i32::try_from(v).ok()
}

fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Integer-valued cell, also accepting a float spelling such as `"1995.0"`.
fn parse_integral(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let v = parse_number(s)?;
    if v.fract() != 0.0 || v.abs() > i64::MAX as f64 {
        return None;
    }
    Some(v as i64)
}
