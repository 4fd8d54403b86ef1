use serde::Serialize;

/// A single untyped cell as produced by the spreadsheet reader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Plain string value.
    Text(String),
    /// Numeric value. Integers are stored as floats, as in the workbook.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Blank cell.
    #[default]
    Empty,
}

impl CellValue {
    /// Renders the cell the way it is shown in the working table and the
    /// exported files.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(value) => value.clone(),
            CellValue::Number(value) => format_number(*value),
            CellValue::Boolean(value) => value.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Whether the cell carries no value.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// The chosen sheet of a workbook: unique column names followed by data rows.
///
/// Every row holds exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSheet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    /// Creates a sheet, padding or truncating rows to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Position of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

/// Names of the six exported fields, in column order.
pub const FIELD_NAMES: [&str; 6] = [
    "itba_code",
    "itba_name",
    "itba_credits",
    "polimi_code",
    "polimi_name",
    "polimi_ects",
];

/// One course equivalence as shown to the user.
///
/// Field order matches [`FIELD_NAMES`]; `include` is never exported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct WorkingRow {
    pub itba_code: String,
    pub itba_name: String,
    pub itba_credits: String,
    pub polimi_code: String,
    pub polimi_name: String,
    pub polimi_ects: String,
    #[serde(skip)]
    pub include: bool,
}

impl WorkingRow {
    /// The six display fields in column order.
    pub fn fields(&self) -> [&str; 6] {
        [
            &self.itba_code,
            &self.itba_name,
            &self.itba_credits,
            &self.polimi_code,
            &self.polimi_name,
            &self.polimi_ects,
        ]
    }
}

/// Optional metadata printed above the equivalence table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentHeader {
    pub student: Option<String>,
    pub id: Option<String>,
    pub program: Option<String>,
    pub term: Option<String>,
}

/// Selected rows plus header, consumed once by the renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    rows: Vec<WorkingRow>,
    header: DocumentHeader,
}

impl DocumentRequest {
    /// Keeps only the included rows, preserving their sheet order.
    pub fn from_selection(rows: &[WorkingRow], header: DocumentHeader) -> Self {
        Self {
            rows: rows.iter().filter(|row| row.include).cloned().collect(),
            header,
        }
    }

    pub fn rows(&self) -> &[WorkingRow] {
        &self.rows
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
