//! Formatted terminal output.
//!
//! We keep formatting code in one place so the pipeline stays free of
//! presentation concerns and output changes are localized.

use crate::aggregate::FuelCensus;
use crate::app::pipeline::RunOutput;
use crate::domain::{FuelKind, RunConfig, dwelling_label, fuel_label};
use crate::io::store::StoredAggregates;
use crate::report::{
    DECADES, decade_totals, dwelling_type_series, latest_breakdown, plausible_move_in_years, yearly_totals,
};

const RULE: &str = "============================================================";

/// Per-year diagnostics of a generation run, followed by failed years.
pub fn format_run_report(output: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== fioul - zone {} | {}..={} | fuel {} ({}) ===\n",
        config.source.zone,
        config.source.first_year,
        config.source.last_year,
        config.target_fuel.code(),
        config.target_fuel.label()
    ));

    out.push_str(
        format!(
            "{:<6} {:>10} {:>9} {:>12} {:>10} {:>10} {:>14}\n",
            "year", "rows", "matched", "no_move_in", "no_type", "no_weight", "weighted"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<10} {:-<9} {:-<12} {:-<10} {:-<10} {:-<14}\n", "", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for o in &output.outcomes {
        let s = &o.stats;
        out.push_str(&format!(
            "{:<6} {:>10} {:>9} {:>12} {:>10} {:>10} {:>14.1}\n",
            o.survey_year,
            s.rows_read,
            s.rows_matched,
            s.excluded.move_in_year,
            s.excluded.dwelling_type,
            s.excluded.weight,
            o.aggregate.total(),
        ));
    }

    if !output.failures.is_empty() {
        out.push_str("\nFailed survey years:\n");
        for f in &output.failures {
            out.push_str(&format!("- {}: {}\n", f.survey_year, f.error));
        }
    }

    out
}

/// Summary of a zone's stored aggregates.
pub fn format_store_summary(stored: &StoredAggregates, title: &str, fuel: FuelKind) -> String {
    let mut out = String::new();
    let fuel_name = fuel.label();

    out.push_str(&format!("{RULE}\nLOGEMENTS AU {fuel_name} PAR ANNÉE D'EMMÉNAGEMENT ({title})\n{RULE}\n"));

    let years = plausible_move_in_years(&stored.by_move_in_year);
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => {
            out.push_str(&format!("Move-in years shown: {first}..={last} ({} distinct)\n", years.len()));
        }
        _ => out.push_str("No move-in year >= 1950 recorded.\n"),
    }

    out.push_str(&format!("\n{:<6}", "survey"));
    for (start, end) in DECADES {
        out.push_str(&format!(" {:>11}", format!("{start}-{end}")));
    }
    out.push('\n');
    for (survey_year, totals) in decade_totals(&stored.by_move_in_year) {
        out.push_str(&format!("{survey_year:<6}"));
        for t in totals {
            out.push_str(&format!(" {t:>11.0}"));
        }
        out.push('\n');
    }

    out.push_str(&format!("\n{RULE}\nLOGEMENTS AU {fuel_name} PAR TYPE DE LOGEMENT ({title})\n{RULE}\n"));

    let series = dwelling_type_series(&stored.by_dwelling_type);
    out.push_str(&format!("{:<6}", "survey"));
    for (kind, _) in &series {
        out.push_str(&format!(" {:>20}", kind.label()));
    }
    out.push_str(&format!(" {:>12}\n", "total"));
    for (i, (survey_year, total)) in yearly_totals(&stored.by_dwelling_type).into_iter().enumerate() {
        out.push_str(&format!("{survey_year:<6}"));
        for (_, points) in &series {
            let w = points.get(i).map(|(_, w)| *w).unwrap_or(0.0);
            out.push_str(&format!(" {w:>20.0}"));
        }
        out.push_str(&format!(" {total:>12.0}\n"));
    }

    out.push_str(&format!("\n{RULE}\nRÉSUMÉ\n{RULE}\n"));
    match latest_breakdown(&stored.by_dwelling_type) {
        Some(b) => {
            out.push_str(&format!(
                "Nombre total de logements ({fuel_name}) en {} : {:.0}\n",
                b.survey_year, b.total
            ));
            out.push_str(&format!("\nRépartition par type de logement en {} :\n", b.survey_year));
            for (code, w, pct) in &b.shares {
                out.push_str(&format!("  {}: {w:.0} logements ({pct:.1}%)\n", dwelling_label(*code)));
            }
        }
        None => out.push_str("No survey year stored.\n"),
    }

    out
}

/// Fuel census table: one row per survey year, count and share per fuel code.
pub fn format_census(censuses: &[FuelCensus]) -> String {
    let mut codes: Vec<u8> = censuses.iter().flat_map(|c| c.counts.keys().copied()).collect();
    codes.sort_unstable();
    codes.dedup();

    let mut out = String::new();
    out.push_str(&format!("{:<6} {:>8}", "year", "total"));
    for code in &codes {
        out.push_str(&format!(" | {}", fuel_label(*code)));
    }
    out.push('\n');

    for c in censuses {
        out.push_str(&format!("{:<6} {:>8}", c.survey_year, c.total_rows));
        for code in &codes {
            out.push_str(&format!(" | {} ({:.2}%)", c.count(*code), c.share(*code)));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use crate::aggregate::fuel_census;
    use crate::app::pipeline::{YearFailure, YearOutcome};
    use crate::domain::{SourceConfig, SourceLayout, SurveyRow, YearStats, YearlyAggregate, Zone};
    use crate::error::PipelineError;

    fn config() -> RunConfig {
        RunConfig {
            source: SourceConfig {
                zone: Zone::C,
                first_year: 2010,
                last_year: 2011,
                layout: SourceLayout::Archive,
                data_dir: PathBuf::from("data/regions/C"),
                file_prefix: String::new(),
            },
            target_fuel: FuelKind::HeatingOil,
            results_dir: PathBuf::from("results/C"),
            write_cross_tab: false,
            parallel: false,
        }
    }

    #[test]
    fn run_report_lists_years_and_failures() {
        let mut aggregate = YearlyAggregate::default();
        aggregate.by_dwelling_type.insert(1, 12.0);
        let output = RunOutput {
            outcomes: vec![YearOutcome {
                survey_year: 2010,
                aggregate,
                stats: YearStats {
                    rows_read: 100,
                    rows_matched: 7,
                    ..YearStats::default()
                },
            }],
            failures: vec![YearFailure {
                survey_year: 2011,
                error: PipelineError::SourceNotFound {
                    year: 2011,
                    path: PathBuf::from("data/regions/C/2011.zip"),
                },
            }],
        };

        let text = format_run_report(&output, &config());
        assert!(text.starts_with("=== fioul - zone C | 2010..=2011 | fuel 3 (Fioul (mazout)) ==="));
        assert!(text.contains("2010          100         7"));
        assert!(text.contains("12.0"));
        assert!(text.contains("Failed survey years:\n- 2011: No survey extract for year 2011"));
    }

    #[test]
    fn store_summary_reports_latest_breakdown() {
        let stored = StoredAggregates {
            by_move_in_year: BTreeMap::from([(2021, BTreeMap::from([(1940, 9.0), (1975, 3.0)]))]),
            by_dwelling_type: BTreeMap::from([(2021, BTreeMap::from([(1, 30.0), (2, 10.0)]))]),
        };
        let text = format_store_summary(&stored, "zone A", FuelKind::HeatingOil);
        assert!(text.contains("Move-in years shown: 1975..=1975 (1 distinct)"));
        assert!(text.contains("Nombre total de logements (Fioul (mazout)) en 2021 : 40"));
        assert!(text.contains("  Maison individuelle: 30 logements (75.0%)"));
        assert!(text.contains("  Appartement: 10 logements (25.0%)"));
    }

    #[test]
    fn empty_store_summary_does_not_panic() {
        let text = format_store_summary(&StoredAggregates::default(), "zone B", FuelKind::HeatingOil);
        assert!(text.contains("No move-in year >= 1950 recorded."));
        assert!(text.contains("No survey year stored."));
    }

    #[test]
    fn census_table_labels_unknown_codes() {
        let row = |code: Option<u8>| SurveyRow {
            fuel_code: code,
            dwelling_type: None,
            move_in_year: None,
            weight: None,
        };
        let census = fuel_census(2015, &[row(Some(3)), row(Some(9)), row(Some(3)), row(None)]);
        let text = format_census(&[census]);
        assert!(text.contains("Fioul (mazout)"));
        assert!(text.contains("Inconnu (9)"));
        assert!(text.contains("2 (50.00%)"));
        assert!(text.contains("1 (25.00%)"));
    }
}
