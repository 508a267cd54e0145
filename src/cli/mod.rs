//! Command-line parsing for the heating-fuel survey statistics.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline code; `app` turns these arguments into a `RunConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{FuelKind, SourceLayout, Zone};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fioul", version, about = "Heating-fuel statistics from INSEE housing-census extracts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate every survey year of a zone and write its JSON files.
    Generate(GenerateArgs),
    /// Print the summary of a zone's stored aggregates.
    Summary(SummaryArgs),
    /// Count dwellings per fuel code for every survey year (unweighted).
    Census(SourceArgs),
}

/// Where the raw extracts live and which years to read.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Zone of the national extract.
    #[arg(short = 'z', long, value_enum, ignore_case = true, default_value_t = Zone::A)]
    pub zone: Zone,

    /// First survey year (inclusive).
    #[arg(long, default_value_t = 2010)]
    pub first_year: u16,

    /// Last survey year (inclusive).
    #[arg(long, default_value_t = 2022)]
    pub last_year: u16,

    /// How yearly extracts are stored.
    #[arg(long, value_enum, default_value_t = SourceLayout::Archive)]
    pub layout: SourceLayout,

    /// Root holding one directory per zone.
    #[arg(long, env = "FIOUL_DATA_DIR", default_value = "data/regions")]
    pub data_root: PathBuf,

    /// Directory of the extracts; overrides `<data-root>/<zone>`.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// File-name prefix of plain extracts (e.g. `melun_` for `melun_2015.csv`).
    #[arg(long, default_value = "")]
    pub file_prefix: String,
}

/// Where aggregates are written to / read from.
#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Root holding one result directory per zone.
    #[arg(long, env = "FIOUL_RESULTS_DIR", default_value = "results")]
    pub results_root: PathBuf,

    /// Result directory; overrides `<results-root>/<zone>`.
    #[arg(long)]
    pub results_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Fuel whose dwellings are aggregated.
    #[arg(long, value_enum, default_value_t = FuelKind::HeatingOil)]
    pub fuel: FuelKind,

    /// Also write the move-in year × dwelling type cross tabulation.
    #[arg(long)]
    pub write_cross_tab: bool,

    /// Process survey years in parallel.
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    /// Zone whose results are read.
    #[arg(short = 'z', long, value_enum, ignore_case = true, default_value_t = Zone::A)]
    pub zone: Zone,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Fuel the stored aggregates were computed for (used for labels).
    #[arg(long, value_enum, default_value_t = FuelKind::HeatingOil)]
    pub fuel: FuelKind,
}
