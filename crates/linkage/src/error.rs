use std::fmt;

/// Coarse error classes. Callers (the CLI exit-code table, retry policies)
/// dispatch on these rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller passed a value outside its domain.
    InvalidArgument,
    /// Training data or record collections are unusable.
    Data,
    /// Configuration is malformed or unreachable.
    Configuration,
    /// Reading or decoding an input file failed.
    Io,
}

#[derive(Debug)]
pub enum LinkageError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad regex, empty file path, etc.).
    ConfigValidation(String),
    /// Error-rate budget outside [0, 1] (or NaN).
    InvalidBudget { name: &'static str, value: f64 },
    /// A label table was built from something other than the 18 signatures.
    SignatureCount { expected: usize, found: usize },
    /// No labeled examples for one of the two classes.
    NoTrainingExamples { class: &'static str },
    /// A labeled pair references an id absent from its dataset.
    UnknownRecordId { dataset: &'static str, id: i64 },
    /// Two records in the same dataset share an id.
    DuplicateRecordId { dataset: &'static str, id: i64 },
    /// `max_matches` cannot be satisfied (negative).
    InvalidMaxMatches(i64),
    /// Missing required column in input data.
    MissingColumn { dataset: String, column: String },
    /// Record or pair id is not an integer.
    IdParse { dataset: String, value: String },
    /// IO error (file read, CSV decode, etc.).
    Io(String),
}

impl LinkageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBudget { .. } | Self::SignatureCount { .. } => ErrorKind::InvalidArgument,
            Self::NoTrainingExamples { .. }
            | Self::UnknownRecordId { .. }
            | Self::DuplicateRecordId { .. } => ErrorKind::Data,
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::InvalidMaxMatches(_) => {
                ErrorKind::Configuration
            }
            Self::MissingColumn { .. } | Self::IdParse { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidBudget { name, value } => {
                write!(f, "{name} must be within [0, 1], got {value}")
            }
            Self::SignatureCount { expected, found } => {
                write!(f, "label table needs {expected} distinct signatures, found {found}")
            }
            Self::NoTrainingExamples { class } => {
                write!(f, "no training examples of one class: zero labeled {class}")
            }
            Self::UnknownRecordId { dataset, id } => {
                write!(f, "labeled pair references unknown {dataset} record id {id}")
            }
            Self::DuplicateRecordId { dataset, id } => {
                write!(f, "{dataset} dataset contains record id {id} more than once")
            }
            Self::InvalidMaxMatches(n) => {
                write!(f, "max_matches must be zero or greater, got {n}")
            }
            Self::MissingColumn { dataset, column } => {
                write!(f, "dataset '{dataset}': missing column '{column}'")
            }
            Self::IdParse { dataset, value } => {
                write!(f, "dataset '{dataset}': cannot parse id '{value}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for LinkageError {}
