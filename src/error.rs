use thiserror::Error;

/// Failure to obtain or decode a record payload.
///
/// A load error never touches the working record set: the table keeps
/// whatever it displayed before and surfaces a notice instead.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The data source could not be reached (missing file, IO failure)
    #[error("data source unreachable: {0}")]
    Unreachable(#[from] std::io::Error),

    /// The data source answered with a non-success status
    #[error("data source returned {0}")]
    Unavailable(String),

    /// The payload could not be decoded at all
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The first row names none of the schema columns
    #[error("payload has no recognisable header row")]
    MissingHeader,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Malformed(err.to_string())
    }
}

/// Failure of the key/value persistence port.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("storage json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The host store refused the operation (quota, privacy mode)
    #[error("storage rejected the write: {0}")]
    Rejected(String),
}

/// Failure to produce or deliver an export payload.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// The clipboard or download collaborator refused the text
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Invalid user input against the current table state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("row {position} is out of range (table has {len} rows)")]
    RowOutOfRange { position: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
