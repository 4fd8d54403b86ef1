use std::path::PathBuf;

use thiserror::Error;

use crate::lagrandt::equivalences::mapping::ColumnRole;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while the
/// tool fetches a workbook, maps its columns, or renders the selection.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization of a report fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the HTTP request for a shared link cannot complete.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Raised when the HTTP client itself cannot be configured.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Raised when the remote host answers with a non-success status.
    #[error("fetching {url} returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a sheet cannot be interpreted as a table.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the requested sheet is not part of the workbook.
    #[error("sheet '{name}' not found; available sheets: {}", available.join(", "))]
    MissingSheet { name: String, available: Vec<String> },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a required role has neither a guess nor an explicit column.
    #[error("no column could be guessed for {role}; pick one of: {}", columns.join(", "))]
    UnresolvedColumn {
        role: ColumnRole,
        columns: Vec<String>,
    },

    /// Raised when a mapping names a column the sheet does not have.
    #[error("column '{column}' chosen for {role} is not present in the sheet")]
    UnknownColumn { role: ColumnRole, column: String },

    /// Raised when an inclusion toggle targets a row that does not exist.
    #[error("row {row} is out of range; the sheet has {rows} data rows")]
    RowOutOfRange { row: usize, rows: usize },

    /// Raised when generation is requested without any included row.
    #[error("no rows are selected; include at least one row to generate the document")]
    NothingSelected,

    /// Errors bubbled up from the zip container writer.
    #[error("document packaging error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Errors bubbled up from the CSV writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when assembling document XML fails.
    #[error("document formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Returns `true` for failures that happen while obtaining or parsing the
    /// workbook, which the CLI reports with a single "check the link" message.
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            ToolError::Fetch { .. }
                | ToolError::HttpClient(_)
                | ToolError::HttpStatus { .. }
                | ToolError::ExcelRead(_)
                | ToolError::InvalidWorkbook(_)
                | ToolError::MissingSheet { .. }
                | ToolError::MissingInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_failures_are_classified() {
        assert!(ToolError::InvalidWorkbook("empty".into()).is_read_failure());
        assert!(
            ToolError::HttpStatus {
                url: "https://example.com".into(),
                status: 404
            }
            .is_read_failure()
        );
        assert!(!ToolError::NothingSelected.is_read_failure());
        assert!(
            !ToolError::UnknownColumn {
                role: ColumnRole::ItbaCode,
                column: "Foo".into()
            }
            .is_read_failure()
        );
    }

    #[test]
    fn client_setup_failure_names_no_url() {
        let source = reqwest::blocking::Client::new()
            .get("not a url")
            .build()
            .expect_err("invalid url rejected");
        let error = ToolError::HttpClient(source);
        assert!(error.to_string().starts_with("failed to build HTTP client: "));
        assert!(error.is_read_failure());
    }

    #[test]
    fn missing_sheet_lists_available_sheets() {
        let error = ToolError::MissingSheet {
            name: "Hoja9".into(),
            available: vec!["Hoja1".into(), "Hoja2".into()],
        };
        assert_eq!(
            error.to_string(),
            "sheet 'Hoja9' not found; available sheets: Hoja1, Hoja2"
        );
    }
}
