//! Read-side analyses over stored aggregates, plus terminal formatting.
//!
//! Move-in years before 1950 are kept in the store but ignored by every view here.

use std::collections::BTreeMap;

use crate::domain::DwellingType;
use crate::io::store::SurveySeries;

pub mod format;

pub use format::*;

/// Earliest move-in year shown in read-side views.
pub const MIN_MOVE_IN_YEAR: i32 = 1950;

/// Move-in year buckets, inclusive on both ends.
pub const DECADES: [(i32, i32); 8] = [
    (1950, 1959),
    (1960, 1969),
    (1970, 1979),
    (1980, 1989),
    (1990, 1999),
    (2000, 2009),
    (2010, 2019),
    (2020, 2021),
];

/// Union of move-in years ≥ 1950 across all survey years, ascending.
pub fn plausible_move_in_years(series: &SurveySeries<i32>) -> Vec<i32> {
    let mut years: Vec<i32> = series
        .values()
        .flat_map(|inner| inner.keys().copied())
        .filter(|&y| y >= MIN_MOVE_IN_YEAR)
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Per survey year, the weighted total of each [`DECADES`] bucket.
pub fn decade_totals(series: &SurveySeries<i32>) -> BTreeMap<u16, [f64; DECADES.len()]> {
    series
        .iter()
        .map(|(&survey_year, inner)| {
            let mut totals = [0.0; DECADES.len()];
            for (slot, (start, end)) in totals.iter_mut().zip(DECADES) {
                *slot = inner.range(start..=end).map(|(_, w)| w).sum();
            }
            (survey_year, totals)
        })
        .collect()
}

/// Per dwelling type of the taxonomy, its weight in every survey year (0 when absent).
pub fn dwelling_type_series(series: &SurveySeries<u8>) -> Vec<(DwellingType, Vec<(u16, f64)>)> {
    DwellingType::ALL
        .into_iter()
        .map(|kind| {
            let points = series
                .iter()
                .map(|(&survey_year, inner)| (survey_year, inner.get(&kind.code()).copied().unwrap_or(0.0)))
                .collect();
            (kind, points)
        })
        .collect()
}

/// Weighted total of the target fuel per survey year.
pub fn yearly_totals(series: &SurveySeries<u8>) -> Vec<(u16, f64)> {
    series
        .iter()
        .map(|(&survey_year, inner)| (survey_year, inner.values().sum()))
        .collect()
}

/// Dwelling-type breakdown of a single survey year.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeBreakdown {
    pub survey_year: u16,
    pub total: f64,
    /// `(dwelling type code, weight, percent of total)`
    pub shares: Vec<(u8, f64, f64)>,
}

/// Breakdown of the latest survey year present in `series`.
pub fn latest_breakdown(series: &SurveySeries<u8>) -> Option<TypeBreakdown> {
    let (&survey_year, inner) = series.iter().next_back()?;
    let total: f64 = inner.values().sum();
    let shares = inner
        .iter()
        .map(|(&code, &w)| {
            let pct = if total > 0.0 { w / total * 100.0 } else { 0.0 };
            (code, w, pct)
        })
        .collect();
    Some(TypeBreakdown {
        survey_year,
        total,
        shares,
    })
}
