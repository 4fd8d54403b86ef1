use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::lagrandt::equivalences::error::{Result, ToolError};
use crate::lagrandt::equivalences::fetch;
use crate::lagrandt::equivalences::io::csv_write::{self, CSV_FILE_NAME};
use crate::lagrandt::equivalences::io::docx_write::{self, DOCX_FILE_NAME};
use crate::lagrandt::equivalences::io::sheet_read::Workbook;
use crate::lagrandt::equivalences::mapping::{
    ColumnMapping, ColumnRole, InclusionToggles, MappingOverrides, build_working_table,
};
use crate::lagrandt::equivalences::model::{DocumentHeader, DocumentRequest, RawSheet};

/// Where the workbook comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Shared link, downloaded through the cached fetcher.
    Link(String),
    /// Local workbook file.
    File(PathBuf),
}

/// A parsed sheet together with the workbook's sheet list.
#[derive(Debug, Clone)]
pub struct LoadedSheet {
    pub sheet_names: Vec<String>,
    pub sheet_name: String,
    pub sheet: RawSheet,
}

/// Fetches or opens the workbook and parses the requested sheet.
#[instrument(level = "info", skip_all, fields(?source, sheet = sheet.unwrap_or("<first>")))]
pub fn load_sheet(source: &Source, sheet: Option<&str>) -> Result<LoadedSheet> {
    match source {
        Source::Link(link) => {
            let bytes = fetch::fetch(link)?;
            read_sheet(Workbook::from_bytes(bytes.to_vec())?, sheet)
        }
        Source::File(path) => read_sheet(Workbook::open(path)?, sheet),
    }
}

fn read_sheet<R: std::io::Read + std::io::Seek>(
    mut workbook: Workbook<R>,
    sheet: Option<&str>,
) -> Result<LoadedSheet> {
    let sheet_name = workbook.resolve_sheet_name(sheet)?;
    let sheet = workbook.read_sheet(&sheet_name)?;
    Ok(LoadedSheet {
        sheet_names: workbook.sheet_names().to_vec(),
        sheet_name,
        sheet,
    })
}

/// Preview entry for one working row.
#[derive(Debug, Clone, Serialize)]
pub struct RowPreview {
    pub row: usize,
    pub fields: [String; 6],
    pub include: bool,
}

/// Summary printed by the `inspect` command.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub sheets: Vec<String>,
    pub sheet: String,
    pub columns: Vec<String>,
    pub mapping: ColumnMapping,
    pub unresolved: Vec<ColumnRole>,
    pub row_count: usize,
    pub selected: usize,
    pub rows: Vec<RowPreview>,
}

/// Guesses the mapping and previews the working table without writing files.
///
/// Unresolved required roles are reported instead of failing, so the user
/// can see which columns to pick by hand.
pub fn inspect(loaded: &LoadedSheet, overrides: MappingOverrides) -> Result<Inspection> {
    let mapping = overrides.apply(ColumnMapping::guess(&loaded.sheet.columns));
    let unresolved = mapping.unresolved_roles();

    let rows = if unresolved.is_empty() {
        build_working_table(&loaded.sheet, &mapping)?
    } else {
        warn!(?unresolved, "mapping incomplete; pick the missing columns");
        Vec::new()
    };

    Ok(Inspection {
        sheets: loaded.sheet_names.clone(),
        sheet: loaded.sheet_name.clone(),
        columns: loaded.sheet.columns.clone(),
        unresolved,
        row_count: loaded.sheet.rows.len(),
        selected: rows.iter().filter(|row| row.include).count(),
        rows: rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| RowPreview {
                row: index + 1,
                fields: row.fields().map(str::to_string),
                include: row.include,
            })
            .collect(),
        mapping,
    })
}

/// Choices made by the user before generating the outputs.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub overrides: MappingOverrides,
    pub toggles: InclusionToggles,
    pub header: DocumentHeader,
}

/// Rendered document and flat export for one request.
#[derive(Debug, Clone)]
pub struct RenderedOutputs {
    pub document: Vec<u8>,
    pub export: Vec<u8>,
    pub rows: usize,
}

/// Maps the sheet, applies the toggles, and renders both outputs.
///
/// Fails with [`ToolError::NothingSelected`] when no row ends up included.
#[instrument(level = "info", skip_all, fields(sheet = %loaded.sheet_name))]
pub fn render_selection(loaded: &LoadedSheet, options: GenerateOptions) -> Result<RenderedOutputs> {
    let mapping = options.overrides.apply(ColumnMapping::guess(&loaded.sheet.columns));
    let mut rows = build_working_table(&loaded.sheet, &mapping)?;
    options.toggles.apply(&mut rows)?;

    let request = DocumentRequest::from_selection(&rows, options.header);
    info!(rows = rows.len(), selected = request.rows().len(), "selection built");
    if request.is_empty() {
        return Err(ToolError::NothingSelected);
    }

    let document = docx_write::render_document(request.rows(), request.header())?;
    let export = csv_write::render_flat_export(request.rows())?;
    Ok(RenderedOutputs {
        document,
        export,
        rows: request.rows().len(),
    })
}

/// Paths of the files written by [`write_outputs`].
#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub document: PathBuf,
    pub export: PathBuf,
}

/// Writes both outputs into `out_dir` under their fixed file names.
///
/// Both files are staged under temporary names first; either both land or
/// neither does.
#[instrument(level = "info", skip(outputs), fields(out_dir = %out_dir.display()))]
pub fn write_outputs(outputs: &RenderedOutputs, out_dir: &Path) -> Result<WrittenFiles> {
    fs::create_dir_all(out_dir)?;
    let document = out_dir.join(DOCX_FILE_NAME);
    let export = out_dir.join(CSV_FILE_NAME);

    let staged_document = stage(out_dir, &outputs.document)?;
    let staged_export = stage(out_dir, &outputs.export)?;

    staged_document
        .persist(&document)
        .map_err(|error| ToolError::Io(error.error))?;
    if let Err(error) = staged_export.persist(&export) {
        warn!(path = %document.display(), "export failed; removing document");
        fs::remove_file(&document)?;
        return Err(ToolError::Io(error.error));
    }

    info!(rows = outputs.rows, "outputs written");
    Ok(WrittenFiles { document, export })
}

fn stage(out_dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(out_dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}
