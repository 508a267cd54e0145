//! Weighted aggregation of one survey year.
//!
//! Three grouped sums of `IPONDL` over the fuel-filtered rows:
//!
//! - by move-in year (every observed year, plausible or not)
//! - by dwelling type
//! - by (move-in year, dwelling type), over the full product of the observed
//!   keys so that empty cells are present with `0.0`
//!
//! A row missing one grouping field still counts in the branch where its other
//! field is known. A missing weight adds nothing but still makes its keys
//! present.

use std::collections::BTreeMap;

use crate::domain::{ExcludedCounts, SurveyRow, YearlyAggregate};

/// Aggregate the fuel-filtered rows of one survey year.
pub fn aggregate_year(rows: &[SurveyRow]) -> YearlyAggregate {
    let mut by_move_in_year: BTreeMap<i32, f64> = BTreeMap::new();
    let mut by_dwelling_type: BTreeMap<u8, f64> = BTreeMap::new();
    let mut cells: BTreeMap<(i32, u8), f64> = BTreeMap::new();

    for r in rows {
        let w = r.weight.unwrap_or(0.0);
        if let Some(year) = r.move_in_year {
            *by_move_in_year.entry(year).or_insert(0.0) += w;
        }
        if let Some(kind) = r.dwelling_type {
            *by_dwelling_type.entry(kind).or_insert(0.0) += w;
        }
        if let (Some(year), Some(kind)) = (r.move_in_year, r.dwelling_type) {
            *cells.entry((year, kind)).or_insert(0.0) += w;
        }
    }

    let by_move_in_year_and_type = by_move_in_year
        .keys()
        .map(|&year| {
            let row = by_dwelling_type
                .keys()
                .map(|&kind| (kind, cells.get(&(year, kind)).copied().unwrap_or(0.0)))
                .collect();
            (year, row)
        })
        .collect();

    YearlyAggregate {
        by_move_in_year,
        by_dwelling_type,
        by_move_in_year_and_type,
    }
}

/// Count fuel-filtered rows left out of a branch because a field is missing.
pub fn excluded_counts(rows: &[SurveyRow]) -> ExcludedCounts {
    rows.iter().fold(ExcludedCounts::default(), |mut acc, r| {
        acc.dwelling_type += usize::from(r.dwelling_type.is_none());
        acc.move_in_year += usize::from(r.move_in_year.is_none());
        acc.weight += usize::from(r.weight.is_none());
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::filter::filter_fuel;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn row(fuel: u8, weight: f64, year: Option<i32>, kind: Option<u8>) -> SurveyRow {
        SurveyRow {
            fuel_code: Some(fuel),
            dwelling_type: kind,
            move_in_year: year,
            weight: Some(weight),
        }
    }

    fn random_rows(seed: u64, n: usize) -> Vec<SurveyRow> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| SurveyRow {
                fuel_code: if rng.gen_bool(0.05) { None } else { Some(rng.gen_range(1..=6)) },
                dwelling_type: if rng.gen_bool(0.1) { None } else { Some(rng.gen_range(1..=3)) },
                move_in_year: if rng.gen_bool(0.1) { None } else { Some(rng.gen_range(1900..=2022)) },
                weight: Some(rng.gen_range(0.1..12.0)),
            })
            .collect()
    }

    #[test]
    fn three_row_scenario() {
        let rows = vec![
            row(3, 2.0, Some(1995), Some(1)),
            row(2, 5.0, Some(1995), Some(1)),
            row(3, 1.0, None, Some(2)),
        ];

        let agg = aggregate_year(&filter_fuel(&rows, 3));
        assert_eq!(agg.by_move_in_year, BTreeMap::from([(1995, 2.0)]));
        assert_eq!(agg.by_dwelling_type, BTreeMap::from([(1, 2.0), (2, 1.0)]));
    }

    #[test]
    fn missing_move_in_year_still_counts_by_type() {
        let rows = vec![row(3, 4.5, None, Some(2))];
        let agg = aggregate_year(&rows);
        assert!(agg.by_move_in_year.is_empty());
        assert_eq!(agg.by_dwelling_type.get(&2), Some(&4.5));
        assert!(agg.by_move_in_year_and_type.is_empty());
    }

    #[test]
    fn implausible_years_are_kept() {
        let rows = vec![row(3, 1.0, Some(1800), Some(1)), row(3, 1.0, Some(9999), Some(1))];
        let agg = aggregate_year(&rows);
        assert_eq!(agg.by_move_in_year.keys().copied().collect::<Vec<_>>(), vec![1800, 9999]);
    }

    #[test]
    fn cross_tab_covers_full_key_product() {
        let rows = vec![
            row(3, 1.5, Some(1990), Some(1)),
            row(3, 2.0, Some(1990), Some(1)),
            row(3, 3.0, Some(2005), Some(2)),
        ];
        let agg = aggregate_year(&rows);

        assert_eq!(agg.by_move_in_year_and_type[&1990], BTreeMap::from([(1, 3.5), (2, 0.0)]));
        assert_eq!(agg.by_move_in_year_and_type[&2005], BTreeMap::from([(1, 0.0), (2, 3.0)]));
    }

    #[test]
    fn missing_weight_adds_nothing_but_keeps_key() {
        let mut r = row(3, 0.0, Some(1970), Some(3));
        r.weight = None;
        let agg = aggregate_year(&[r]);
        assert_eq!(agg.by_move_in_year.get(&1970), Some(&0.0));
        assert_eq!(agg.by_dwelling_type.get(&3), Some(&0.0));
        assert_eq!(excluded_counts(&[r]).weight, 1);
    }

    #[test]
    fn empty_input_gives_empty_aggregate() {
        assert_eq!(aggregate_year(&[]), YearlyAggregate::default());
    }

    #[test]
    fn dwelling_type_sum_matches_rows_with_known_type() {
        for seed in 0..8 {
            let rows = filter_fuel(&random_rows(seed, 500), 3);
            let agg = aggregate_year(&rows);

            let expected: f64 = rows
                .iter()
                .filter(|r| r.dwelling_type.is_some())
                .filter_map(|r| r.weight)
                .sum();
            assert!((agg.total() - expected).abs() < 1e-9 * expected.max(1.0));

            let expected_years: f64 = rows
                .iter()
                .filter(|r| r.move_in_year.is_some())
                .filter_map(|r| r.weight)
                .sum();
            let got_years: f64 = agg.by_move_in_year.values().sum();
            assert!((got_years - expected_years).abs() < 1e-9 * expected_years.max(1.0));

            // Each cross-tab row adds up to the rows with both fields known.
            for (year, cells) in &agg.by_move_in_year_and_type {
                let expected_row: f64 = rows
                    .iter()
                    .filter(|r| r.move_in_year == Some(*year) && r.dwelling_type.is_some())
                    .filter_map(|r| r.weight)
                    .sum();
                let got_row: f64 = cells.values().sum();
                assert!((got_row - expected_row).abs() < 1e-9 * expected_row.max(1.0));
            }
        }
    }

    #[test]
    fn aggregation_is_bit_identical_when_repeated() {
        let rows = filter_fuel(&random_rows(42, 2_000), 3);
        let first = aggregate_year(&rows);
        let second = aggregate_year(&rows);

        let bits = |m: &BTreeMap<i32, f64>| m.iter().map(|(k, v)| (*k, v.to_bits())).collect::<Vec<_>>();
        assert_eq!(bits(&first.by_move_in_year), bits(&second.by_move_in_year));
        assert_eq!(first, second);
    }

    #[test]
    fn excluded_counts_per_field() {
        let rows = vec![
            row(3, 1.0, None, Some(1)),
            row(3, 1.0, Some(2000), None),
            row(3, 1.0, None, None),
        ];
        assert_eq!(
            excluded_counts(&rows),
            ExcludedCounts {
                dwelling_type: 2,
                move_in_year: 2,
                weight: 0,
            }
        );
    }
}
