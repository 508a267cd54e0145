//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the survey taxonomies (`Zone`, `FuelKind`, `DwellingType`)
//! - run configuration (`SourceConfig`, `RunConfig`, `SourceLayout`)
//! - normalized rows and per-year aggregates (`SurveyRow`, `YearlyAggregate`, `YearStats`)

pub mod types;

pub use types::*;
