//! Shared generation pipeline used by the `generate` and `census` commands.
//!
//! Per survey year, one pass of:
//! source read -> field normalization -> fuel filter -> weighted aggregation
//!
//! Years are independent: a failing year is recorded and the run moves on.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::aggregate::{FuelCensus, aggregate_year, excluded_counts, filter_fuel, fuel_census};
use crate::domain::{RunConfig, SourceConfig, YearStats, YearlyAggregate};
use crate::error::PipelineError;
use crate::io::ingest::NormalizedTable;
use crate::io::source::{AGGREGATION_COLUMNS, CENSUS_COLUMNS, RawRow, SurveySource, source_for};

/// Output of one successful survey year.
#[derive(Debug, Clone)]
pub struct YearOutcome {
    pub survey_year: u16,
    pub aggregate: YearlyAggregate,
    pub stats: YearStats,
}

/// A survey year that could not be aggregated.
#[derive(Debug)]
pub struct YearFailure {
    pub survey_year: u16,
    pub error: PipelineError,
}

/// All outcomes of a generation run, in survey-year order.
#[derive(Debug, Default)]
pub struct RunOutput {
    pub outcomes: Vec<YearOutcome>,
    pub failures: Vec<YearFailure>,
}

impl RunOutput {
    /// Aggregates of the successful years, keyed by survey year.
    pub fn aggregates(&self) -> BTreeMap<u16, YearlyAggregate> {
        self.outcomes
            .iter()
            .map(|o| (o.survey_year, o.aggregate.clone()))
            .collect()
    }
}

/// Run the generation pipeline over every configured survey year.
pub fn run_generation(config: &RunConfig) -> RunOutput {
    let source = source_for(&config.source);
    run_generation_with_source(config, source.as_ref())
}

/// Same as [`run_generation`] with an explicit source.
pub fn run_generation_with_source(config: &RunConfig, source: &dyn SurveySource) -> RunOutput {
    let target = config.target_fuel.code();
    let years: Vec<u16> = config.survey_years().collect();

    let results: Vec<(u16, Result<YearOutcome, PipelineError>)> = if config.parallel {
        years
            .par_iter()
            .map(|&year| (year, process_year(source, year, target)))
            .collect()
    } else {
        years
            .iter()
            .map(|&year| (year, process_year(source, year, target)))
            .collect()
    };

    let mut output = RunOutput::default();
    for (survey_year, result) in results {
        match result {
            Ok(outcome) => output.outcomes.push(outcome),
            Err(error) => {
                log::warn!("Survey year {survey_year} failed: {error}");
                output.failures.push(YearFailure { survey_year, error });
            }
        }
    }
    output
}

/// Read, normalize, filter and aggregate a single survey year.
pub fn process_year(source: &dyn SurveySource, survey_year: u16, target_fuel: u8) -> Result<YearOutcome, PipelineError> {
    let normalized = load_year(source, survey_year, AGGREGATION_COLUMNS)?;

    let matched = filter_fuel(&normalized.rows, target_fuel);
    let aggregate = aggregate_year(&matched);
    let stats = YearStats {
        rows_read: normalized.rows.len(),
        rows_matched: matched.len(),
        unparsable: normalized.unparsable,
        excluded: excluded_counts(&matched),
    };

    log::info!(
        "Survey year {survey_year}: {} rows read, {} matched fuel {target_fuel}",
        stats.rows_read,
        stats.rows_matched
    );
    if !stats.excluded.is_zero() {
        log::warn!(
            "Survey year {survey_year}: matched rows without move-in year={}, dwelling type={}, weight={}",
            stats.excluded.move_in_year,
            stats.excluded.dwelling_type,
            stats.excluded.weight
        );
    }

    Ok(YearOutcome {
        survey_year,
        aggregate,
        stats,
    })
}

/// Unweighted fuel census over every configured survey year.
///
/// Only the fuel column is required, so commune extracts without weights work.
pub fn run_census(config: &SourceConfig) -> (Vec<FuelCensus>, Vec<YearFailure>) {
    let source = source_for(config);
    let mut censuses = Vec::new();
    let mut failures = Vec::new();
    for survey_year in config.survey_years() {
        match load_year(source.as_ref(), survey_year, CENSUS_COLUMNS) {
            Ok(normalized) => censuses.push(fuel_census(survey_year, &normalized.rows)),
            Err(error) => {
                log::warn!("Survey year {survey_year} failed: {error}");
                failures.push(YearFailure { survey_year, error });
            }
        }
    }
    (censuses, failures)
}

// Rows are normalized as they stream in; no raw table is kept.
fn load_year(
    source: &dyn SurveySource,
    survey_year: u16,
    required: &[&str],
) -> Result<NormalizedTable, PipelineError> {
    log::debug!("Survey year {survey_year}: reading {}", source.location(survey_year));
    let mut table = NormalizedTable::default();
    source.read_rows(survey_year, required, &mut |raw: &RawRow<'_>| table.push(raw))?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::domain::{FuelKind, SourceLayout, Zone};

    const HEADER: &str = "COMMUNE;CMBL;IPONDL;AEMM;TYPL\n";

    fn config(dir: PathBuf, first_year: u16, last_year: u16) -> RunConfig {
        RunConfig {
            source: SourceConfig {
                zone: Zone::A,
                first_year,
                last_year,
                layout: SourceLayout::Plain,
                data_dir: dir.clone(),
                file_prefix: String::new(),
            },
            target_fuel: FuelKind::HeatingOil,
            results_dir: dir.join("results"),
            write_cross_tab: false,
            parallel: false,
        }
    }

    #[test]
    fn end_to_end_three_rows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("2012.csv"),
            format!("{HEADER}77288;3;2,0;1995;1\n77288;2;5,0;1995;1\n77288;3;1,0;;2\n"),
        )
        .unwrap();

        let output = run_generation(&config(dir.path().to_path_buf(), 2012, 2012));
        assert!(output.failures.is_empty());
        let outcome = &output.outcomes[0];
        assert_eq!(outcome.aggregate.by_move_in_year, BTreeMap::from([(1995, 2.0)]));
        assert_eq!(outcome.aggregate.by_dwelling_type, BTreeMap::from([(1, 2.0), (2, 1.0)]));
        assert_eq!(outcome.stats.rows_read, 3);
        assert_eq!(outcome.stats.rows_matched, 2);
        assert_eq!(outcome.stats.excluded.move_in_year, 1);
        assert_eq!(outcome.stats.unparsable.move_in_year, 1);
    }

    #[test]
    fn garbage_move_in_year_still_counts_by_dwelling_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2019.csv"), format!("{HEADER}1;3;4.5;NR;2\n")).unwrap();

        let output = run_generation(&config(dir.path().to_path_buf(), 2019, 2019));
        let agg = &output.outcomes[0].aggregate;
        assert!(agg.by_move_in_year.is_empty());
        assert_eq!(agg.by_dwelling_type, BTreeMap::from([(2, 4.5)]));
    }

    #[test]
    fn failing_year_does_not_stop_other_years() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2010.csv"), format!("{HEADER}1;3;1,5;1990;1\n")).unwrap();
        std::fs::write(dir.path().join("2012.csv"), "CMBL;IPONDL\n3;1.0\n").unwrap();
        std::fs::write(dir.path().join("2013.csv"), format!("{HEADER}1;3;2.5;2001;2\n")).unwrap();

        let output = run_generation(&config(dir.path().to_path_buf(), 2010, 2013));
        let ok: Vec<u16> = output.outcomes.iter().map(|o| o.survey_year).collect();
        assert_eq!(ok, vec![2010, 2013]);

        assert_eq!(output.failures.len(), 2);
        assert_eq!(output.failures[0].survey_year, 2011);
        assert!(matches!(output.failures[0].error, PipelineError::SourceNotFound { .. }));
        assert_eq!(output.failures[1].survey_year, 2012);
        assert!(matches!(output.failures[1].error, PipelineError::MalformedTable { .. }));

        let aggregates = output.aggregates();
        assert_eq!(aggregates.keys().copied().collect::<Vec<_>>(), vec![2010, 2013]);
        assert_eq!(aggregates[&2010].by_move_in_year[&1990], 1.5);
    }

    #[test]
    fn parallel_run_matches_sequential_run() {
        let dir = tempfile::tempdir().unwrap();
        for (i, year) in (2014..=2018).enumerate() {
            let body: String = (0..50)
                .map(|j| format!("1;{};{}.25;{};{}\n", 1 + (i + j) % 6, j, 1950 + j, 1 + j % 3))
                .collect();
            std::fs::write(dir.path().join(format!("{year}.csv")), format!("{HEADER}{body}")).unwrap();
        }

        let mut cfg = config(dir.path().to_path_buf(), 2014, 2019);
        let sequential = run_generation(&cfg);
        cfg.parallel = true;
        let parallel = run_generation(&cfg);

        assert_eq!(sequential.aggregates(), parallel.aggregates());
        assert_eq!(parallel.failures.len(), 1);
        assert_eq!(parallel.failures[0].survey_year, 2019);
    }

    #[test]
    fn census_counts_rows_per_fuel() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("melun_2011.csv"),
            format!("{HEADER}77288;3;1;1990;1\n77288;4;1;1990;1\n77288;Z;1;1990;1\n77288;3;1;1990;2\n"),
        )
        .unwrap();

        let mut cfg = config(dir.path().to_path_buf(), 2011, 2012);
        cfg.source.file_prefix = "melun_".to_string();
        let (censuses, failures) = run_census(&cfg.source);
        assert_eq!(censuses.len(), 1);
        assert_eq!(censuses[0].total_rows, 4);
        assert_eq!(censuses[0].count(3), 2);
        assert_eq!(censuses[0].share(3), 50.0);
        assert_eq!(failures[0].survey_year, 2012);
    }

    #[test]
    fn census_reads_extract_with_only_fuel_column() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2014.csv"), "COMMUNE;CMBL\n77288;3\n77288;1\n77288;3\n77288;6\n").unwrap();

        let cfg = config(dir.path().to_path_buf(), 2014, 2014);
        let (censuses, failures) = run_census(&cfg.source);
        assert!(failures.is_empty());
        assert_eq!(censuses[0].count(3), 2);
        assert_eq!(censuses[0].share(6), 25.0);

        // The weighted run still needs every column.
        let output = run_generation(&cfg);
        assert!(matches!(output.failures[0].error, PipelineError::MalformedTable { .. }));
    }
}
