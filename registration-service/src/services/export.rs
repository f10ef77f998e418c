//! Tabular exports.
//!
//! A [`Table`] is built once from query rows and rendered either as an XLSX
//! workbook (`rust_xlsxwriter`) or as CSV (`csv`), quoting every field.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::services::ServiceError;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Excel,
    Csv,
}

impl ExportFormat {
    /// `excel`/`xlsx` or `csv`, case-insensitive. Absent means Excel.
    pub fn parse(value: Option<&str>) -> Result<Self, ServiceError> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(ExportFormat::Excel),
            Some(v) if v.eq_ignore_ascii_case("excel") || v.eq_ignore_ascii_case("xlsx") => {
                Ok(ExportFormat::Excel)
            }
            Some(v) if v.eq_ignore_ascii_case("csv") => Ok(ExportFormat::Csv),
            Some(v) => Err(ServiceError::validation(format!(
                "Invalid export format: {}",
                v
            ))),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Excel => XLSX_CONTENT_TYPE,
            ExportFormat::Csv => CSV_CONTENT_TYPE,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Money(Decimal),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn as_csv(&self) -> String {
        match self {
            Cell::Text(value) => value.clone(),
            Cell::Money(value) => value.to_string(),
        }
    }
}

/// Rendered export ready to be served as an attachment.
#[derive(Debug)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct Table {
    headers: &'static [&'static str],
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: &'static [&'static str]) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self, format: ExportFormat, sheet_name: &str) -> Result<ExportFile, ServiceError> {
        let bytes = match format {
            ExportFormat::Excel => self.to_xlsx(sheet_name),
            ExportFormat::Csv => self.to_csv(),
        }?;
        Ok(ExportFile { format, bytes })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, ServiceError> {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        writer
            .write_record(self.headers)
            .map_err(|e| ServiceError::Internal(e.into()))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(Cell::as_csv))
                .map_err(|e| ServiceError::Internal(e.into()))?;
        }

        writer.into_inner().map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("CSV export failed: {}", e.error()))
        })
    }

    pub fn to_xlsx(&self, sheet_name: &str) -> Result<Vec<u8>, ServiceError> {
        self.write_workbook(sheet_name)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("XLSX export failed: {}", e)))
    }

    fn write_workbook(&self, sheet_name: &str) -> Result<Vec<u8>, XlsxError> {
        let header_format = Format::new().set_bold();
        let money_format = Format::new().set_num_format("#,##0.00");

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (index, row) in self.rows.iter().enumerate() {
            let row_num = index as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(value) => {
                        worksheet.write_string(row_num, col, value.as_str())?;
                    }
                    Cell::Money(value) => {
                        worksheet.write_number_with_format(
                            row_num,
                            col,
                            value.to_f64().unwrap_or_default(),
                            &money_format,
                        )?;
                    }
                }
            }
        }
        worksheet.autofit();

        workbook.save_to_buffer()
    }
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_date(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// Attachment file name with the export date, e.g. `invoices-export-2026-10-14.xlsx`.
pub fn file_name(prefix: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!("{}-{}.{}", prefix, now.format("%Y-%m-%d"), format.extension())
}
