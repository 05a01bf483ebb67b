use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ReportError {
    #[error("missing config file {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unknown text encoding: {0}")]
    #[diagnostic(help("use a WHATWG encoding label such as UTF-8 or ISO-8859-1"))]
    UnknownEncoding(String),

    #[error("invalid delimiter: {0}")]
    InvalidDelimiter(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("state file error: {0}")]
    State(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("invalid filter terms: {0}")]
    InvalidTerms(String),

    #[error("portal error: {0}")]
    Portal(String),
}
