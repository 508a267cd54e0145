//! Unweighted fuel census of one survey year.
//!
//! Counts raw rows per fuel code, the way the per-commune overview tables do:
//! unparsable fuel codes are left out of every code but still count in the total.

use std::collections::BTreeMap;

use crate::domain::SurveyRow;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuelCensus {
    pub survey_year: u16,
    pub total_rows: usize,
    pub counts: BTreeMap<u8, usize>,
}

impl FuelCensus {
    pub fn count(&self, code: u8) -> usize {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    /// Share of rows heated with `code`, in percent rounded to 2 decimals.
    pub fn share(&self, code: u8) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        let pct = self.count(code) as f64 / self.total_rows as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }
}

pub fn fuel_census(survey_year: u16, rows: &[SurveyRow]) -> FuelCensus {
    let mut counts = BTreeMap::new();
    for code in rows.iter().filter_map(|r| r.fuel_code) {
        *counts.entry(code).or_insert(0) += 1;
    }
    FuelCensus {
        survey_year,
        total_rows: rows.len(),
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fuel: Option<u8>) -> SurveyRow {
        SurveyRow {
            fuel_code: fuel,
            dwelling_type: None,
            move_in_year: None,
            weight: None,
        }
    }

    #[test]
    fn counts_codes_and_keeps_unparsable_in_total() {
        let rows = vec![row(Some(3)), row(Some(3)), row(Some(4)), row(None)];
        let census = fuel_census(2014, &rows);
        assert_eq!(census.total_rows, 4);
        assert_eq!(census.count(3), 2);
        assert_eq!(census.count(4), 1);
        assert_eq!(census.count(1), 0);
        assert_eq!(census.share(3), 50.0);
        assert_eq!(census.share(4), 25.0);
    }

    #[test]
    fn share_is_rounded_and_safe_on_empty() {
        let rows = vec![row(Some(3)), row(Some(2)), row(Some(2))];
        let census = fuel_census(2020, &rows);
        assert_eq!(census.share(3), 33.33);
        assert_eq!(fuel_census(2020, &[]).share(3), 0.0);
    }
}
