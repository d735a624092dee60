//! Rentscout Export
//!
//! Writes ranked listings through a single flat row shape, [`ExportRow`], so
//! every format sees the same columns in the same order.
//!
//! # Example
//!
//! ```ignore
//! use rentscout_export::{export_configured, ExportRow};
//!
//! let rows = ExportRow::from_ranked(&ranked, &config.costs);
//! let written = export_configured(&config.export, &config.output_dir()?, &rows)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod row;
pub mod sink;

pub use error::{ExportError, Result};
pub use row::{Cell, ExportRow};
pub use sink::{open_sink, CsvSink, ExportFormat, ExportSink, JsonSink, XlsxSink};

use rentscout_core::ExportConfig;
use std::path::{Path, PathBuf};

/// Formats enabled in `config`, in a fixed order.
#[must_use]
pub fn enabled_formats(config: &ExportConfig) -> Vec<ExportFormat> {
    [
        (config.json, ExportFormat::Json),
        (config.csv, ExportFormat::Csv),
        (config.xlsx, ExportFormat::Xlsx),
    ]
    .into_iter()
    .filter_map(|(on, format)| on.then_some(format))
    .collect()
}

/// Write `rows` in every format `config` enables, into `dir`.
///
/// Returns the written files.
pub fn export_configured(
    config: &ExportConfig,
    dir: &Path,
    rows: &[ExportRow],
) -> Result<Vec<PathBuf>> {
    let formats = enabled_formats(config);
    if formats.is_empty() {
        return Err(ExportError::NoFormat);
    }
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let mut sink = open_sink(format, dir)?;
        sink.write_all(rows)?;
        let path = sink.finish()?;
        tracing::info!(path = %path.display(), rows = rows.len(), "Exported listings");
        written.push(path);
    }
    Ok(written)
}
