use std::path::PathBuf;

/// Typed failures of the generation and read-back pipeline.
///
/// Row-level parse failures are not represented here: unparsable fields are
/// dropped from the affected aggregation branch and only counted.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("No survey extract for year {year}: {path} not found")]
    SourceNotFound { year: u16, path: PathBuf },
    #[error("Malformed table {path}: missing column(s) {}", .missing.join(", "))]
    MalformedTable { path: PathBuf, missing: Vec<String> },
    #[error("Corrupt aggregate file {path}: {reason}")]
    CorruptAggregate { path: PathBuf, reason: String },
    /// JSON has no encoding for NaN or infinities.
    #[error("Refusing to write {path}: weighted sum at survey year {survey_year}, key {key} is {value}")]
    NonFiniteAggregate {
        path: PathBuf,
        survey_year: u16,
        key: String,
        value: f64,
    },
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read CSV table {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to open archive {path}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("Failed to encode aggregate file {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// Process exit code used when this error ends a run.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::SourceNotFound { .. } | Self::MalformedTable { .. } | Self::Csv { .. } | Self::Zip { .. } => 3,
            Self::CorruptAggregate { .. } | Self::NonFiniteAggregate { .. } | Self::Json { .. } => 4,
            Self::Io { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let mut message = err.to_string();
        let mut current = std::error::Error::source(&err);
        while let Some(cause) = current {
            message.push_str(&format!(": {cause}"));
            current = cause.source();
        }
        Self::new(err.exit_code(), message)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
