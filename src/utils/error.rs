use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoriolisError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInputError { message: String },

    #[error("Not enough stations for region ({i}, {j}): wanted {wanted}, found {found}")]
    InsufficientDataError {
        i: usize,
        j: usize,
        wanted: usize,
        found: usize,
    },

    #[error("Data inconsistency: {message}")]
    DataInconsistencyError { message: String },

    #[error("Parse error in {source_name} line {line}: {message}")]
    ParseError {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a run that failed with this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Medium => 2,
            Self::High => 1,
            Self::Critical => 3,
        }
    }
}

impl CoriolisError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInputError {
            message: message.into(),
        }
    }

    pub fn parse(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::InvalidInputError { .. }
            | Self::InsufficientDataError { .. }
            | Self::DataInconsistencyError { .. }
            | Self::ParseError { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_) => ErrorCategory::Input,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::IoError(_) | Self::TaskError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigurationError { .. } => {
                "Check grid.json (active cells inside W x H, positive Size) and the stats profiles"
            }
            Self::InvalidConfigValueError { .. } | Self::MissingConfigError { .. } => {
                "Fix the value in the settings file or on the command line"
            }
            Self::TomlError(_) => "Make sure the settings file is valid TOML",
            Self::InvalidInputError { .. } => {
                "Re-run build-zips and verify the station history file is complete"
            }
            Self::InsufficientDataError { .. } => {
                "Lower grid.nearest or activate cells closer to more stations"
            }
            Self::DataInconsistencyError { .. } => {
                "Check stats.overrides against the active cells in grid.json"
            }
            Self::ParseError { .. } | Self::CsvError(_) | Self::SerializationError(_) => {
                "The source file looks corrupt; download it again"
            }
            Self::HttpError(_) => "Check the network connection and download.base_url, then retry",
            Self::IoError(_) => "Check that the data and work directories exist and are writable",
            Self::TaskError(_) => "An ingest worker crashed; re-run with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Input data problem: {}", self),
            ErrorCategory::Network => format!("Download failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoriolisError>;
