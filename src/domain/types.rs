//! Shared domain types.
//!
//! These types are intentionally small and `Copy` where possible so they can be:
//!
//! - produced row by row while normalizing large survey extracts
//! - moved across threads when years are processed in parallel
//! - persisted through the aggregate store

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Geographic zone of the national "Logement" extract (files `FD_LOGEMTZ<zone>_<year>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
pub enum Zone {
    A,
    B,
    C,
    D,
    E,
}

impl Zone {
    pub const ALL: [Zone; 5] = [Zone::A, Zone::B, Zone::C, Zone::D, Zone::E];

    pub fn letter(self) -> char {
        match self {
            Zone::A => 'A',
            Zone::B => 'B',
            Zone::C => 'C',
            Zone::D => 'D',
            Zone::E => 'E',
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Main heating fuel (`CMBL` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FuelKind {
    DistrictHeating,
    TownGas,
    HeatingOil,
    Electricity,
    BottledGas,
    Other,
}

impl FuelKind {
    pub const ALL: [FuelKind; 6] = [
        FuelKind::DistrictHeating,
        FuelKind::TownGas,
        FuelKind::HeatingOil,
        FuelKind::Electricity,
        FuelKind::BottledGas,
        FuelKind::Other,
    ];

    pub fn code(self) -> u8 {
        match self {
            FuelKind::DistrictHeating => 1,
            FuelKind::TownGas => 2,
            FuelKind::HeatingOil => 3,
            FuelKind::Electricity => 4,
            FuelKind::BottledGas => 5,
            FuelKind::Other => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            FuelKind::DistrictHeating => "Chauffage urbain",
            FuelKind::TownGas => "Gaz de ville/réseau",
            FuelKind::HeatingOil => "Fioul (mazout)",
            FuelKind::Electricity => "Électricité",
            FuelKind::BottledGas => "Gaz bouteille/citerne",
            FuelKind::Other => "Autre",
        }
    }
}

/// Label for a raw fuel code, including codes outside the taxonomy.
pub fn fuel_label(code: u8) -> String {
    match FuelKind::from_code(code) {
        Some(kind) => kind.label().to_string(),
        None => format!("Inconnu ({code})"),
    }
}

/// Dwelling type (`TYPL` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DwellingType {
    House,
    Apartment,
    Other,
}

impl DwellingType {
    pub const ALL: [DwellingType; 3] = [DwellingType::House, DwellingType::Apartment, DwellingType::Other];

    pub fn code(self) -> u8 {
        match self {
            DwellingType::House => 1,
            DwellingType::Apartment => 2,
            DwellingType::Other => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            DwellingType::House => "Maison individuelle",
            DwellingType::Apartment => "Appartement",
            DwellingType::Other => "Autre",
        }
    }
}

/// Label for a raw dwelling-type code, including codes outside the taxonomy.
pub fn dwelling_label(code: u8) -> String {
    match DwellingType::from_code(code) {
        Some(kind) => kind.label().to_string(),
        None => format!("Type {code}"),
    }
}

/// How a zone's yearly extracts are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceLayout {
    /// `<data_dir>/<prefix><year>.csv`
    Plain,
    /// `<data_dir>/<year>.zip`, member `FD_LOGEMTZ<zone>_<year>.{txt,csv}`
    Archive,
}

/// Where and which survey years to read. Shared by every command that reads extracts.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub zone: Zone,
    pub first_year: u16,
    pub last_year: u16,
    pub layout: SourceLayout,
    pub data_dir: PathBuf,
    /// File-name prefix for plain extracts (e.g. `melun_`).
    pub file_prefix: String,
}

impl SourceConfig {
    pub fn survey_years(&self) -> std::ops::RangeInclusive<u16> {
        self.first_year..=self.last_year
    }
}

/// Full configuration of one generation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: SourceConfig,
    pub target_fuel: FuelKind,
    pub results_dir: PathBuf,
    /// Also persist the move-in year × dwelling type cross tabulation.
    pub write_cross_tab: bool,
    pub parallel: bool,
}

impl RunConfig {
    pub fn survey_years(&self) -> std::ops::RangeInclusive<u16> {
        self.source.survey_years()
    }
}

/// One dwelling record after normalization. `None` marks an unparsable or missing field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurveyRow {
    pub fuel_code: Option<u8>,
    pub dwelling_type: Option<u8>,
    pub move_in_year: Option<i32>,
    pub weight: Option<f64>,
}

/// Weighted cross-tabulations for one survey year and one target fuel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearlyAggregate {
    pub by_move_in_year: BTreeMap<i32, f64>,
    pub by_dwelling_type: BTreeMap<u8, f64>,
    /// Move-in year → dwelling type → weight, over the full product of observed keys.
    pub by_move_in_year_and_type: BTreeMap<i32, BTreeMap<u8, f64>>,
}

impl YearlyAggregate {
    /// Weighted total of rows with a known dwelling type.
    pub fn total(&self) -> f64 {
        self.by_dwelling_type.values().sum()
    }
}

/// Per-field counters used for the dropped-row diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldCounts {
    pub fuel_code: usize,
    pub dwelling_type: usize,
    pub move_in_year: usize,
    pub weight: usize,
}

/// Fuel-matched rows left out of an aggregation branch, per missing field.
///
/// The fuel code is never missing here: the filter already dropped those rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExcludedCounts {
    pub dwelling_type: usize,
    pub move_in_year: usize,
    pub weight: usize,
}

impl ExcludedCounts {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Diagnostics of one survey year's generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearStats {
    pub rows_read: usize,
    /// Rows whose fuel code equals the target.
    pub rows_matched: usize,
    /// Unparsable values per column, over the whole table.
    pub unparsable: FieldCounts,
    pub excluded: ExcludedCounts,
}
