//! Fuel filter.

use crate::domain::SurveyRow;

/// Rows whose fuel code equals `target` exactly. A missing fuel code never matches.
pub fn filter_fuel(rows: &[SurveyRow], target: u8) -> Vec<SurveyRow> {
    rows.iter().filter(|r| r.fuel_code == Some(target)).copied().collect()
}
