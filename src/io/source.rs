//! Source Reader: locate and open one survey year's raw extract.
//!
//! Two storage layouts exist upstream:
//! - bare `;`-separated files (`<dir>/<prefix><year>.csv`)
//! - yearly zip archives (`<dir>/<year>.zip`) whose member name depends on the year
//!
//! Records are streamed: each one is handed to the caller as borrowed raw
//! strings of the four retained columns, and nothing is buffered here.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::ByteRecord;

use crate::domain::{SourceConfig, SourceLayout, Zone};
use crate::error::PipelineError;

pub const COL_FUEL: &str = "CMBL";
pub const COL_WEIGHT: &str = "IPONDL";
pub const COL_MOVE_IN_YEAR: &str = "AEMM";
pub const COL_DWELLING_TYPE: &str = "TYPL";

/// Columns the weighted aggregation cannot run without.
pub const AGGREGATION_COLUMNS: &[&str] = &[COL_FUEL, COL_WEIGHT, COL_MOVE_IN_YEAR, COL_DWELLING_TYPE];

/// Columns the fuel census cannot run without.
pub const CENSUS_COLUMNS: &[&str] = &[COL_FUEL];

/// First survey year whose archive member is published as `.csv` instead of `.txt`.
pub const CSV_MEMBER_SINCE: u16 = 2016;

/// Raw values of the retained columns for one dwelling record.
///
/// Cells borrow from the record being read. A column absent from the table
/// reads as an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow<'a> {
    pub fuel_code: Cow<'a, str>,
    pub weight: Cow<'a, str>,
    pub move_in_year: Cow<'a, str>,
    pub dwelling_type: Cow<'a, str>,
}

/// Capability to stream the raw records of a survey year.
pub trait SurveySource: Send + Sync {
    /// Where the extract for `year` is expected (for diagnostics).
    fn location(&self, year: u16) -> String;

    /// Read the extract for `year` to completion, calling `visit` once per record.
    ///
    /// Fails with `MalformedTable` if any column of `required` is absent.
    fn read_rows(
        &self,
        year: u16,
        required: &[&str],
        visit: &mut dyn FnMut(&RawRow<'_>),
    ) -> Result<(), PipelineError>;
}

/// Bare delimited files: `<dir>/<prefix><year>.csv`.
#[derive(Debug, Clone)]
pub struct PlainFileSource {
    pub dir: PathBuf,
    pub file_prefix: String,
}

impl PlainFileSource {
    pub fn new(dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn path_for(&self, year: u16) -> PathBuf {
        self.dir.join(format!("{}{year}.csv", self.file_prefix))
    }
}

impl SurveySource for PlainFileSource {
    fn location(&self, year: u16) -> String {
        self.path_for(year).display().to_string()
    }

    fn read_rows(
        &self,
        year: u16,
        required: &[&str],
        visit: &mut dyn FnMut(&RawRow<'_>),
    ) -> Result<(), PipelineError> {
        let path = self.path_for(year);
        let file = File::open(&path).map_err(|source| open_error(year, &path, source))?;
        log::info!("Loading {}...", path.display());
        read_delimited(file, &path, required, visit)
    }
}

/// Yearly zip archives: `<dir>/<year>.zip`, member per [`archive_member_name`].
#[derive(Debug, Clone)]
pub struct ArchiveMemberSource {
    pub dir: PathBuf,
    pub zone: Zone,
}

impl ArchiveMemberSource {
    pub fn new(dir: impl Into<PathBuf>, zone: Zone) -> Self {
        Self { dir: dir.into(), zone }
    }

    pub fn archive_path(&self, year: u16) -> PathBuf {
        self.dir.join(format!("{year}.zip"))
    }
}

impl SurveySource for ArchiveMemberSource {
    fn location(&self, year: u16) -> String {
        format!(
            "{}!{}",
            self.archive_path(year).display(),
            archive_member_name(self.zone, year)
        )
    }

    fn read_rows(
        &self,
        year: u16,
        required: &[&str],
        visit: &mut dyn FnMut(&RawRow<'_>),
    ) -> Result<(), PipelineError> {
        let archive_path = self.archive_path(year);
        let file = File::open(&archive_path).map_err(|source| open_error(year, &archive_path, source))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|source| PipelineError::Zip {
            path: archive_path.clone(),
            source,
        })?;

        let member = archive_member_name(self.zone, year);
        log::debug!("Resolved {} member for {year}: {member}", archive_path.display());
        let member_path = archive_path.join(&member);
        let entry = match archive.by_name(&member) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(PipelineError::SourceNotFound { year, path: member_path });
            }
            Err(source) => {
                return Err(PipelineError::Zip {
                    path: archive_path,
                    source,
                });
            }
        };

        log::info!("Loading {}...", member_path.display());
        read_delimited(entry, &member_path, required, visit)
    }
}

/// Name of the extract inside a yearly archive.
///
/// The publisher switched the member extension from `.txt` to `.csv` in 2016.
pub fn archive_member_name(zone: Zone, year: u16) -> String {
    let ext = if year < CSV_MEMBER_SINCE { "txt" } else { "csv" };
    format!("FD_LOGEMTZ{zone}_{year}.{ext}")
}

/// Build the source matching the configured layout.
pub fn source_for(config: &SourceConfig) -> Box<dyn SurveySource> {
    match config.layout {
        SourceLayout::Plain => Box::new(PlainFileSource::new(&config.data_dir, config.file_prefix.clone())),
        SourceLayout::Archive => Box::new(ArchiveMemberSource::new(&config.data_dir, config.zone)),
    }
}

fn open_error(year: u16, path: &Path, source: std::io::Error) -> PipelineError {
    if source.kind() == std::io::ErrorKind::NotFound {
        PipelineError::SourceNotFound {
            year,
            path: path.to_path_buf(),
        }
    } else {
        PipelineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Stream a `;`-separated table, handing the retained columns of each record to `visit`.
///
/// Short rows are tolerated (absent cells read as empty strings); a row the
/// CSV layer cannot decode at all ends the read with `PipelineError::Csv`.
pub fn read_delimited<R: Read>(
    reader: R,
    path: &Path,
    required: &[&str],
    visit: &mut dyn FnMut(&RawRow<'_>),
) -> Result<(), PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .byte_headers()
        .map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let header_map = build_header_map(&headers);

    let missing: Vec<String> = required
        .iter()
        .filter(|name| !header_map.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MalformedTable {
            path: path.to_path_buf(),
            missing,
        });
    }

    let idx = |name: &str| {
        let found = header_map.get(name).copied();
        if found.is_none() {
            log::debug!("{}: no {name} column, reading it as empty", path.display());
        }
        found
    };
    let (fuel_idx, weight_idx, year_idx, type_idx) = (
        idx(COL_FUEL),
        idx(COL_WEIGHT),
        idx(COL_MOVE_IN_YEAR),
        idx(COL_DWELLING_TYPE),
    );

    let mut record = ByteRecord::new();
    loop {
        let more = reader.read_byte_record(&mut record).map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if !more {
            break;
        }
        visit(&RawRow {
            fuel_code: field(&record, fuel_idx),
            weight: field(&record, weight_idx),
            move_in_year: field(&record, year_idx),
            dwelling_type: field(&record, type_idx),
        });
    }

    Ok(())
}

fn build_header_map(headers: &ByteRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(&String::from_utf8_lossy(name)), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Some exports carry a UTF-8 BOM on the first header.
    name.trim().trim_start_matches('\u{feff}').to_ascii_uppercase()
}

fn field(record: &ByteRecord, idx: Option<usize>) -> Cow<'_, str> {
    idx.and_then(|i| record.get(i))
        .map(String::from_utf8_lossy)
        .unwrap_or_default()
}
