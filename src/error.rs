// ⚠️ Import errors - the failure conditions callers branch on
// Everything else travels as anyhow::Error with context attached.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// A file was found but lacks a column the stage cannot work without
    #[error("{file}: missing required column {column} (headers: {headers})")]
    MissingColumn {
        file: PathBuf,
        column: &'static str,
        headers: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
