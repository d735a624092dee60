//! Export error types.

use thiserror::Error;

/// Errors writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Output file could not be created or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Workbook could not be built or saved
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Export settings disable every format
    #[error("no export format enabled")]
    NoFormat,
}

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
