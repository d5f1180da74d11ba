use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContabilError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown tenant: {0}")]
    UnknownTenant(String),

    #[error("Unknown company: {0}")]
    UnknownCompany(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown report line: {0}")]
    UnknownReportLine(String),

    #[error("Invalid field mapping: {0}")]
    Mapping(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ContabilError>;
