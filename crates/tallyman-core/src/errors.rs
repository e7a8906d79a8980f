use tallyman_core_types::RunId;
use thiserror::Error;

/// Result type alias using the canonical structured error
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers, tests and the CLI
/// can match on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// Bad or missing connection parameters, connectivity failure, DDL failure
    Configuration,
    /// The migration source location could not be read
    Discovery,
    /// A referenced migration artifact does not exist
    NotFound,
    /// An artifact exists but does not satisfy the migration unit contract
    InvalidUnit,
    /// A statement inside a unit's apply operation failed
    MigrationExecution,
    /// The bookkeeping row could not be written after a successful apply
    Persistence,
    Io,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Discovery => "ERR_DISCOVERY",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidUnit => "ERR_INVALID_UNIT",
            ExErrorKind::MigrationExecution => "ERR_MIGRATION_EXECUTION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a kind for programmatic handling plus the context needed to act
/// on it: which operation failed, which migration version was involved, and
/// for statement failures the SQLSTATE-like status code.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    version: Option<String>,
    sql_state: Option<String>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            version: None,
            sql_state: None,
            run_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add migration version context
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add the database status code a statement failed with
    pub fn with_sql_state(mut self, code: impl Into<String>) -> Self {
        self.sql_state = Some(code.into());
        self
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Version of the migration that was being handled, if any
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Status code reported by the database for a failed statement
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Machine-readable rendering used by `--json` output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "op": self.op,
            "version": self.version,
            "sql_state": self.sql_state,
            "run_id": self.run_id.as_ref().map(RunId::as_str),
            "message": self.message,
        })
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(version) = &self.version {
            write!(f, " (version: {})", version)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Concrete failures raised by the migration engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrationError {
    // ===== Connection / configuration =====
    #[error("server address not provided")]
    MissingServerAddress,

    #[error("database name not provided")]
    MissingDatabaseName,

    #[error("invalid database url: {reason}")]
    InvalidUrl { reason: String },

    #[error("unsupported database driver: {scheme}")]
    UnsupportedDriver { scheme: String },

    /// A table name, charset, collation or option key that is not a plain identifier
    #[error("invalid {what}: {value:?}")]
    InvalidIdentifier { what: String, value: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("registry namespace {registry} does not match configured namespace {configured}")]
    NamespaceMismatch {
        registry: String,
        configured: String,
    },

    // ===== Versions / discovery =====
    #[error("invalid migration version {value:?}: expected 14 digits YYYYMMDDHHMMSS")]
    InvalidVersion { value: String },

    #[error("more than one migration artifact for version {version}: {artifacts:?}")]
    DuplicateVersion {
        version: String,
        artifacts: Vec<String>,
    },

    /// A `Version<14 digits>` name whose digits are not a calendar timestamp
    #[error("migration artifact {path} has an impossible timestamp {value}")]
    ImpossibleTimestamp { path: String, value: String },

    #[error("cannot read migrations source {path}: {reason}")]
    SourceUnreadable { path: String, reason: String },

    #[error("Not found migration artifact for version {version} in {location}")]
    ArtifactNotFound { version: String, location: String },

    #[error("Migration {version} is not a valid unit: {reason}")]
    InvalidUnit { version: String, reason: String },

    // ===== Execution =====
    #[error("SQL ERROR {code}: {message}")]
    StatementFailed { code: String, message: String },
}

impl From<MigrationError> for ExError {
    fn from(err: MigrationError) -> Self {
        let message = err.to_string();
        match err {
            MigrationError::MissingServerAddress
            | MigrationError::MissingDatabaseName
            | MigrationError::InvalidUrl { .. } => ExError::new(ExErrorKind::Configuration)
                .with_op("parse_database_url")
                .with_message(message),

            MigrationError::UnsupportedDriver { .. } => ExError::new(ExErrorKind::Configuration)
                .with_op("open_connection")
                .with_message(message),

            MigrationError::InvalidIdentifier { .. }
            | MigrationError::InvalidConfiguration { .. }
            | MigrationError::NamespaceMismatch { .. } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("validate_configuration")
                    .with_message(message)
            }

            MigrationError::InvalidVersion { value } => ExError::new(ExErrorKind::Configuration)
                .with_op("parse_version")
                .with_version(value)
                .with_message(message),

            MigrationError::DuplicateVersion { version, .. } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("list_available")
                    .with_version(version)
                    .with_message(message)
            }

            MigrationError::ImpossibleTimestamp { value, .. } => {
                ExError::new(ExErrorKind::Discovery)
                    .with_op("list_available")
                    .with_version(value)
                    .with_message(message)
            }

            MigrationError::SourceUnreadable { .. } => ExError::new(ExErrorKind::Discovery)
                .with_op("list_available")
                .with_message(message),

            MigrationError::ArtifactNotFound { version, .. } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_op("load")
                    .with_version(version)
                    .with_message(message)
            }

            MigrationError::InvalidUnit { version, .. } => ExError::new(ExErrorKind::InvalidUnit)
                .with_op("load")
                .with_version(version)
                .with_message(message),

            MigrationError::StatementFailed { code, .. } => {
                ExError::new(ExErrorKind::MigrationExecution)
                    .with_op("exec_sql")
                    .with_sql_state(code)
                    .with_message(message)
            }
        }
    }
}
