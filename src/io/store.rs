//! Read/write the per-zone aggregate JSON files.
//!
//! Layout of `<results_dir>/`:
//! - `fioul_par_annee_emmenagement.json`: survey year → move-in year → weight
//! - `fioul_par_type_logement.json`: survey year → dwelling type → weight
//! - `fioul_par_annee_et_type.json` (opt-in): survey year → move-in year → dwelling type → weight
//!
//! All keys are decimal strings of their integer originals. Writes overwrite
//! the whole file; reads coerce every key back to an integer. A write without
//! the cross tabulation removes any cross-tab file left by an earlier run, and
//! nothing is written if a sum is not finite.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::domain::YearlyAggregate;
use crate::error::PipelineError;

pub const MOVE_IN_YEAR_FILE: &str = "fioul_par_annee_emmenagement.json";
pub const DWELLING_TYPE_FILE: &str = "fioul_par_type_logement.json";
pub const CROSS_TAB_FILE: &str = "fioul_par_annee_et_type.json";

/// Survey year → inner key → weighted sum.
pub type SurveySeries<K> = BTreeMap<u16, BTreeMap<K, f64>>;

/// Survey year → move-in year → dwelling type → weighted sum.
pub type CrossTabSeries = BTreeMap<u16, BTreeMap<i32, BTreeMap<u8, f64>>>;

/// The two marginal series as read back from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredAggregates {
    pub by_move_in_year: SurveySeries<i32>,
    pub by_dwelling_type: SurveySeries<u8>,
}

/// One zone's result directory.
#[derive(Debug, Clone)]
pub struct AggregateStore {
    dir: PathBuf,
}

impl AggregateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Overwrite the zone's files with `aggregates` (survey years ascending).
    ///
    /// Every value is checked before the first file is touched. Returns the paths written.
    pub fn write(
        &self,
        aggregates: &BTreeMap<u16, YearlyAggregate>,
        include_cross_tab: bool,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let by_move_in_year: SurveySeries<i32> = aggregates
            .iter()
            .map(|(year, agg)| (*year, agg.by_move_in_year.clone()))
            .collect();
        let by_dwelling_type: SurveySeries<u8> = aggregates
            .iter()
            .map(|(year, agg)| (*year, agg.by_dwelling_type.clone()))
            .collect();
        let cross: Option<CrossTabSeries> = include_cross_tab.then(|| {
            aggregates
                .iter()
                .map(|(year, agg)| (*year, agg.by_move_in_year_and_type.clone()))
                .collect()
        });

        let move_in_path = self.path(MOVE_IN_YEAR_FILE);
        let type_path = self.path(DWELLING_TYPE_FILE);
        let cross_path = self.path(CROSS_TAB_FILE);
        for (survey_year, cells) in &by_move_in_year {
            ensure_finite(&move_in_path, *survey_year, "", cells)?;
        }
        for (survey_year, cells) in &by_dwelling_type {
            ensure_finite(&type_path, *survey_year, "", cells)?;
        }
        for (survey_year, rows) in cross.iter().flatten() {
            for (year, cells) in rows {
                ensure_finite(&cross_path, *survey_year, &format!("{year}/"), cells)?;
            }
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| PipelineError::Io {
            path: self.dir.clone(),
            source,
        })?;

        write_series(&move_in_path, &by_move_in_year)?;
        write_series(&type_path, &by_dwelling_type)?;
        let mut written = vec![move_in_path, type_path];

        match cross {
            Some(cross) => {
                write_series(&cross_path, &cross)?;
                written.push(cross_path);
            }
            None => remove_stale(&cross_path)?,
        }

        Ok(written)
    }

    /// Read both marginal series back.
    pub fn read(&self) -> Result<StoredAggregates, PipelineError> {
        Ok(StoredAggregates {
            by_move_in_year: read_series(&self.path(MOVE_IN_YEAR_FILE))?,
            by_dwelling_type: read_series(&self.path(DWELLING_TYPE_FILE))?,
        })
    }

    /// Read the cross tabulation, if it was persisted.
    pub fn read_cross_tab(&self) -> Result<Option<CrossTabSeries>, PipelineError> {
        let path = self.path(CROSS_TAB_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let root = read_json(&path)?;
        let outer = as_object(&root, &path, "top level")?;
        let mut out = BTreeMap::new();
        for (survey_key, inner) in outer {
            let survey_year: u16 = parse_key(survey_key, &path)?;
            let by_year = as_object(inner, &path, survey_key)?;
            let mut rows = BTreeMap::new();
            for (year_key, cells) in by_year {
                let year: i32 = parse_key(year_key, &path)?;
                rows.insert(year, parse_leaves(cells, &path, year_key)?);
            }
            out.insert(survey_year, rows);
        }
        Ok(Some(out))
    }
}

/// Serialize a nested mapping as pretty JSON, overwriting `path`.
pub fn write_series<T: Serialize>(path: &Path, series: &T) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, series).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn ensure_finite<K: Display>(
    path: &Path,
    survey_year: u16,
    prefix: &str,
    cells: &BTreeMap<K, f64>,
) -> Result<(), PipelineError> {
    match cells.iter().find(|(_, value)| !value.is_finite()) {
        Some((key, value)) => Err(PipelineError::NonFiniteAggregate {
            path: path.to_path_buf(),
            survey_year,
            key: format!("{prefix}{key}"),
            value: *value,
        }),
        None => Ok(()),
    }
}

// An absent file is already the desired state.
fn remove_stale(path: &Path) -> Result<(), PipelineError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::info!("Removed {} left by an earlier run", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PipelineError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read a two-level series, coercing survey-year and inner keys to integers.
pub fn read_series<K>(path: &Path) -> Result<SurveySeries<K>, PipelineError>
where
    K: FromStr + Ord,
{
    let root = read_json(path)?;
    let outer = as_object(&root, path, "top level")?;
    let mut out = BTreeMap::new();
    for (survey_key, inner) in outer {
        let survey_year: u16 = parse_key(survey_key, path)?;
        out.insert(survey_year, parse_leaves(inner, path, survey_key)?);
    }
    Ok(out)
}

fn read_json(path: &Path) -> Result<Value, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| corrupt(path, format!("invalid JSON: {e}")))
}

fn as_object<'a>(
    value: &'a Value,
    path: &Path,
    at: &str,
) -> Result<&'a serde_json::Map<String, Value>, PipelineError> {
    value
        .as_object()
        .ok_or_else(|| corrupt(path, format!("expected an object at `{at}`")))
}

fn parse_leaves<K>(value: &Value, path: &Path, at: &str) -> Result<BTreeMap<K, f64>, PipelineError>
where
    K: FromStr + Ord,
{
    let mut out = BTreeMap::new();
    for (key, leaf) in as_object(value, path, at)? {
        let k: K = parse_key(key, path)?;
        let v = leaf
            .as_f64()
            .ok_or_else(|| corrupt(path, format!("value at `{at}`/`{key}` is not a number: {leaf}")))?;
        out.insert(k, v);
    }
    Ok(out)
}

fn parse_key<K: FromStr>(key: &str, path: &Path) -> Result<K, PipelineError> {
    key.trim()
        .parse::<K>()
        .map_err(|_| corrupt(path, format!("key `{key}` is not an integer")))
}

fn corrupt(path: &Path, reason: String) -> PipelineError {
    PipelineError::CorruptAggregate {
        path: path.to_path_buf(),
        reason,
    }
}
