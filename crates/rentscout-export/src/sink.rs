//! Export sinks: one per output format.

use crate::error::Result;
use crate::row::{Cell, ExportRow};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A destination for export rows.
pub trait ExportSink {
    /// Add one row.
    fn append(&mut self, row: &ExportRow) -> Result<()>;

    /// Add rows in order.
    fn write_all(&mut self, rows: &[ExportRow]) -> Result<()> {
        rows.iter().try_for_each(|row| self.append(row))
    }

    /// Flush everything to disk and return the written file.
    fn finish(&mut self) -> Result<PathBuf>;
}

/// `{ count, exported_at, listings: [...] }` as pretty JSON.
pub struct JsonSink {
    path: PathBuf,
    rows: Vec<ExportRow>,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    count: usize,
    exported_at: String,
    listings: &'a [ExportRow],
}

impl JsonSink {
    /// Sink writing to `path` on finish.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Vec::new(),
        }
    }
}

impl ExportSink for JsonSink {
    fn append(&mut self, row: &ExportRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<PathBuf> {
        let document = JsonDocument {
            count: self.rows.len(),
            exported_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            listings: &self.rows,
        };
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.flush()?;
        Ok(self.path.clone())
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_csv_row<W: Write>(w: &mut W, fields: &[String]) -> std::io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(field) {
            write!(w, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            w.write_all(field.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

fn csv_value(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.clone(),
        Cell::Number(n) => n.to_string(),
        Cell::Bool(true) => "Y".to_string(),
        Cell::Bool(false) => "N".to_string(),
    }
}

/// Comma-separated values with a header row; flags as `Y`/`N`.
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Create `path` and write the header.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut writer = BufWriter::new(File::create(&path)?);
        let header: Vec<String> = ExportRow::COLUMNS.iter().map(ToString::to_string).collect();
        write_csv_row(&mut writer, &header)?;
        Ok(Self { path, writer })
    }
}

impl ExportSink for CsvSink {
    fn append(&mut self, row: &ExportRow) -> Result<()> {
        let fields: Vec<String> = row.cells().iter().map(csv_value).collect();
        write_csv_row(&mut self.writer, &fields)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        Ok(self.path.clone())
    }
}

/// A single-sheet workbook with a frozen, bold header row.
pub struct XlsxSink {
    path: PathBuf,
    workbook: Workbook,
    next_row: u32,
}

impl XlsxSink {
    /// Start a workbook that will be saved to `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Listings")?;
        for (col, name) in (0u16..).zip(ExportRow::COLUMNS) {
            sheet.write_string_with_format(0, col, *name, &header)?;
        }
        sheet.set_freeze_panes(1, 0)?;

        Ok(Self {
            path: path.into(),
            workbook,
            next_row: 1,
        })
    }
}

impl ExportSink for XlsxSink {
    fn append(&mut self, row: &ExportRow) -> Result<()> {
        let r = self.next_row;
        let sheet = self.workbook.worksheet_from_index(0)?;
        for (col, cell) in (0u16..).zip(row.cells()) {
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(r, col, s)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(r, col, n)?;
                }
                Cell::Bool(b) => {
                    sheet.write_boolean(r, col, b)?;
                }
            }
        }
        self.next_row += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<PathBuf> {
        self.workbook.save(&self.path)?;
        Ok(self.path.clone())
    }
}

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// `listings.json`
    Json,
    /// `listings.csv`
    Csv,
    /// `listings.xlsx`
    Xlsx,
}

/// Open the sink for `format` inside `dir`.
///
/// # Errors
/// Fails if the output file cannot be created.
pub fn open_sink(format: ExportFormat, dir: &Path) -> Result<Box<dyn ExportSink>> {
    let sink: Box<dyn ExportSink> = match format {
        ExportFormat::Json => Box::new(JsonSink::new(dir.join("listings.json"))),
        ExportFormat::Csv => Box::new(CsvSink::create(dir.join("listings.csv"))?),
        ExportFormat::Xlsx => Box::new(XlsxSink::create(dir.join("listings.xlsx"))?),
    };
    Ok(sink)
}
