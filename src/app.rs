//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments into a `RunConfig`
//! - runs the generation pipeline and writes the aggregate store
//! - prints run reports and store summaries

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Command, GenerateArgs, SourceArgs, StoreArgs, SummaryArgs};
use crate::domain::{FuelKind, RunConfig, SourceConfig, Zone};
use crate::error::AppError;
use crate::io::store::AggregateStore;

pub mod pipeline;

/// Exit code of a run in which at least one survey year failed.
pub const EXIT_PARTIAL_FAILURE: u8 = 3;

/// Entry point for the `fioul` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Generate(args) => handle_generate(args),
        Command::Summary(args) => handle_summary(args),
        Command::Census(args) => handle_census(args),
    }
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.source, &args.store, args.fuel, args.write_cross_tab, args.parallel)?;
    let output = pipeline::run_generation(&config);

    println!("{}", crate::report::format_run_report(&output, &config));

    // Only the years that succeeded are written.
    if !output.outcomes.is_empty() {
        let store = AggregateStore::new(&config.results_dir);
        let written = store.write(&output.aggregates(), config.write_cross_tab)?;
        for path in written {
            println!("Wrote {}", path.display());
        }
    }

    if output.failures.is_empty() {
        Ok(())
    } else {
        let years: Vec<String> = output.failures.iter().map(|f| f.survey_year.to_string()).collect();
        Err(AppError::new(
            EXIT_PARTIAL_FAILURE,
            format!("{} survey year(s) failed: {}", years.len(), years.join(", ")),
        ))
    }
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let dir = results_dir(&args.store, args.zone);
    let store = AggregateStore::new(&dir);
    let stored = store.read()?;

    let title = format!("zone {}, {}", args.zone, chrono::Local::now().format("%Y-%m-%d"));
    println!("{}", crate::report::format_store_summary(&stored, &title, args.fuel));

    if let Some(cross) = store.read_cross_tab()? {
        println!("Cross tabulation stored for {} survey year(s).", cross.len());
    }
    Ok(())
}

fn handle_census(args: SourceArgs) -> Result<(), AppError> {
    let config = source_config_from_args(&args)?;
    let (censuses, failures) = pipeline::run_census(&config);

    println!("{}", crate::report::format_census(&censuses));
    if failures.is_empty() {
        return Ok(());
    }
    for f in &failures {
        println!("- {}: {}", f.survey_year, f.error);
    }
    Err(AppError::new(
        EXIT_PARTIAL_FAILURE,
        format!("{} survey year(s) failed", failures.len()),
    ))
}

/// Resolve the extract location and survey years.
pub fn source_config_from_args(source: &SourceArgs) -> Result<SourceConfig, AppError> {
    if source.first_year > source.last_year {
        return Err(AppError::new(
            2,
            format!(
                "Invalid survey year range: first_year={} > last_year={}.",
                source.first_year, source.last_year
            ),
        ));
    }

    let data_dir = source
        .data_dir
        .clone()
        .unwrap_or_else(|| source.data_root.join(source.zone.to_string()));

    Ok(SourceConfig {
        zone: source.zone,
        first_year: source.first_year,
        last_year: source.last_year,
        layout: source.layout,
        data_dir,
        file_prefix: source.file_prefix.clone(),
    })
}

/// Resolve CLI arguments into the generation configuration.
pub fn run_config_from_args(
    source: &SourceArgs,
    store: &StoreArgs,
    target_fuel: FuelKind,
    write_cross_tab: bool,
    parallel: bool,
) -> Result<RunConfig, AppError> {
    Ok(RunConfig {
        source: source_config_from_args(source)?,
        target_fuel,
        results_dir: results_dir(store, source.zone),
        write_cross_tab,
        parallel,
    })
}

fn results_dir(store: &StoreArgs, zone: Zone) -> PathBuf {
    store
        .results_dir
        .clone()
        .unwrap_or_else(|| store.results_root.join(zone.to_string()))
}
