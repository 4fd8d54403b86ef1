use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::lagrandt::equivalences::error::{Result, ToolError};
use crate::lagrandt::equivalences::model::{CellValue, RawSheet};

/// An opened workbook whose sheets can be listed and parsed.
pub struct Workbook<R: Read + Seek> {
    inner: Xlsx<R>,
    sheet_names: Vec<String>,
}

impl Workbook<Cursor<Vec<u8>>> {
    /// Opens a workbook held in memory, e.g. the body of a fetched link.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes.into()))
    }
}

impl Workbook<std::io::BufReader<std::fs::File>> {
    /// Opens a workbook stored on disk.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let inner: Xlsx<_> = calamine::open_workbook(path)?;
        Ok(Self::wrap(inner))
    }
}

impl<R: Read + Seek> Workbook<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let inner = Xlsx::new(reader)?;
        Ok(Self::wrap(inner))
    }

    fn wrap(inner: Xlsx<R>) -> Self {
        let sheet_names = inner.sheet_names().to_vec();
        debug!(sheets = ?sheet_names, "workbook opened");
        Self { inner, sheet_names }
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Resolves the requested sheet name, defaulting to the first sheet.
    pub fn resolve_sheet_name(&self, requested: Option<&str>) -> Result<String> {
        match requested {
            Some(name) if self.sheet_names.iter().any(|sheet| sheet == name) => {
                Ok(name.to_string())
            }
            Some(name) => Err(ToolError::MissingSheet {
                name: name.to_string(),
                available: self.sheet_names.clone(),
            }),
            None => self
                .sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ToolError::InvalidWorkbook("workbook has no sheets".into())),
        }
    }

    /// Parses the named sheet, treating its first row as the header.
    pub fn read_sheet(&mut self, name: &str) -> Result<RawSheet> {
        let range = self.inner.worksheet_range(name).ok_or_else(|| ToolError::MissingSheet {
            name: name.to_string(),
            available: self.sheet_names.clone(),
        })??;
        let sheet = range_to_sheet(&range)?;
        info!(
            sheet = name,
            columns = sheet.columns.len(),
            rows = sheet.rows.len(),
            "sheet parsed"
        );
        Ok(sheet)
    }
}

fn range_to_sheet(range: &Range<DataType>) -> Result<RawSheet> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| ToolError::InvalidWorkbook("sheet has no header row".into()))?;
    let columns = header_names(header);

    let data = rows
        .map(|row| row.iter().map(to_cell_value).collect())
        .collect();
    Ok(RawSheet::new(columns, data))
}

/// Names blank headers `Unnamed: <index>` and suffixes repeats with `.<n>`.
fn header_names(header: &[DataType]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(header.len());

    for (index, cell) in header.iter().enumerate() {
        let value = to_cell_value(cell);
        let base = if value.is_empty() {
            format!("Unnamed: {index}")
        } else {
            value.to_text()
        };

        let name = match seen.get(&base).copied() {
            Some(mut count) => loop {
                count += 1;
                let candidate = format!("{base}.{count}");
                if !seen.contains_key(&candidate) {
                    seen.insert(base.clone(), count);
                    break candidate;
                }
            },
            None => base,
        };
        seen.insert(name.clone(), 0);
        names.push(name);
    }
    names
}

fn to_cell_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Boolean(*value),
        DataType::Empty => CellValue::Empty,
        DataType::DateTime(serial) => CellValue::Text(
            excel_serial_to_datetime(*serial)
                .map(|datetime| datetime.format(DATETIME_FORMAT).to_string())
                .unwrap_or_else(|| cell.to_string()),
        ),
        other => CellValue::Text(other.to_string()),
    }
}

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Converts a 1900-system Excel serial (days since 1899-12-30) to a timestamp.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * MILLIS_PER_DAY).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<DataType> {
        values
            .iter()
            .map(|value| {
                if value.is_empty() {
                    DataType::Empty
                } else {
                    DataType::String(value.to_string())
                }
            })
            .collect()
    }

    #[test]
    fn blank_and_repeated_headers_get_unique_names() {
        let names = header_names(&strings(&["Materia", "", "Materia", "Materia", "Materia.1"]));
        assert_eq!(
            names,
            ["Materia", "Unnamed: 1", "Materia.1", "Materia.2", "Materia.1.1"]
        );
    }

    #[test]
    fn cells_keep_their_type() {
        assert_eq!(to_cell_value(&DataType::Int(4)), CellValue::Number(4.0));
        assert_eq!(to_cell_value(&DataType::Bool(false)), CellValue::Boolean(false));
        assert_eq!(
            to_cell_value(&DataType::String("x".into())),
            CellValue::Text("x".into())
        );
        assert_eq!(to_cell_value(&DataType::Empty), CellValue::Empty);
    }

    #[test]
    fn date_cells_render_as_timestamps() {
        assert_eq!(
            to_cell_value(&DataType::DateTime(45292.0)),
            CellValue::Text("2024-01-01 00:00:00".into())
        );
        assert_eq!(
            to_cell_value(&DataType::DateTime(45292.5)),
            CellValue::Text("2024-01-01 12:00:00".into())
        );
    }

    #[test]
    fn garbage_bytes_are_a_read_failure() {
        let error = Workbook::from_bytes(b"not a workbook".to_vec())
            .err()
            .expect("garbage rejected");
        assert!(error.is_read_failure());
    }
}
