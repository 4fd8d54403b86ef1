//! Column guessing and working-table construction.
//!
//! A workbook shared by students rarely uses the same headers twice, so every
//! semantic role carries ordered groups of candidate terms in Spanish, English,
//! and Italian. [`guess_column`] walks them in priority order and the first
//! substring hit wins. The resulting [`ColumnMapping`] can be overridden by the
//! user before [`build_working_table`] projects the sheet into
//! [`WorkingRow`]s.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::lagrandt::equivalences::error::{Result, ToolError};
use crate::lagrandt::equivalences::model::{CellValue, RawSheet, WorkingRow};

/// Trimmed, lower-cased selection values that exclude a row.
pub const FALSE_TOKENS: [&str; 4] = ["0", "no", "false", "f"];

const CODE_TERMS: &[&str] = &["cód", "cod", "codigo", "código"];

/// Candidate groups for the selection source column.
pub const SELECTION_CANDIDATES: &[&[&str]] = &[&[
    "selección",
    "seleccion",
    "checkbox",
    "check",
    "créditos seleccionados",
    "creditos seleccionados",
    "incluir",
    "include",
]];
pub const ITBA_CODE_CANDIDATES: &[&[&str]] = &[&["itba"], CODE_TERMS];
pub const ITBA_NAME_CANDIDATES: &[&[&str]] = &[&["materia itba", "materia", "itba"]];
pub const ITBA_CREDITS_CANDIDATES: &[&[&str]] =
    &[&["créditos itba", "creditos itba", "cr itba"]];
pub const POLIMI_CODE_CANDIDATES: &[&[&str]] = &[&["polimi"], CODE_TERMS, &["code"]];
pub const POLIMI_NAME_CANDIDATES: &[&[&str]] = &[&[
    "description",
    "descripción",
    "descripcion",
    "materia polimi",
    "polimi",
]];
pub const POLIMI_ECTS_CANDIDATES: &[&[&str]] = &[&["ects", "total", "créditos", "creditos"]];

/// Returns the first column matching the candidate groups, honouring group
/// order first, then term order, then column order.
pub fn guess_column<S: AsRef<str>>(columns: &[S], candidate_groups: &[&[&str]]) -> Option<String> {
    let normalized: Vec<String> = columns
        .iter()
        .map(|column| column.as_ref().trim().to_lowercase())
        .collect();

    for group in candidate_groups {
        for term in *group {
            if let Some(index) = normalized.iter().position(|column| column.contains(term)) {
                return Some(columns[index].as_ref().to_string());
            }
        }
    }
    None
}

/// Semantic role a sheet column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Selection,
    ItbaCode,
    ItbaName,
    ItbaCredits,
    PolimiCode,
    PolimiName,
    PolimiEcts,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 7] = [
        ColumnRole::Selection,
        ColumnRole::ItbaCode,
        ColumnRole::ItbaName,
        ColumnRole::ItbaCredits,
        ColumnRole::PolimiCode,
        ColumnRole::PolimiName,
        ColumnRole::PolimiEcts,
    ];

    /// Ordered candidate groups used to guess this role.
    pub fn candidates(self) -> &'static [&'static [&'static str]] {
        match self {
            ColumnRole::Selection => SELECTION_CANDIDATES,
            ColumnRole::ItbaCode => ITBA_CODE_CANDIDATES,
            ColumnRole::ItbaName => ITBA_NAME_CANDIDATES,
            ColumnRole::ItbaCredits => ITBA_CREDITS_CANDIDATES,
            ColumnRole::PolimiCode => POLIMI_CODE_CANDIDATES,
            ColumnRole::PolimiName => POLIMI_NAME_CANDIDATES,
            ColumnRole::PolimiEcts => POLIMI_ECTS_CANDIDATES,
        }
    }

    /// Whether a working row cannot be built without this role.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            ColumnRole::ItbaCode
                | ColumnRole::ItbaName
                | ColumnRole::PolimiCode
                | ColumnRole::PolimiName
        )
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnRole::Selection => "selection column",
            ColumnRole::ItbaCode => "ITBA code",
            ColumnRole::ItbaName => "ITBA name",
            ColumnRole::ItbaCredits => "ITBA credits",
            ColumnRole::PolimiCode => "POLIMI code",
            ColumnRole::PolimiName => "POLIMI name",
            ColumnRole::PolimiEcts => "POLIMI ECTS",
        };
        f.write_str(label)
    }
}

/// Column name assigned to each role, guessed or chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ColumnMapping {
    pub selection: Option<String>,
    pub itba_code: Option<String>,
    pub itba_name: Option<String>,
    pub itba_credits: Option<String>,
    pub polimi_code: Option<String>,
    pub polimi_name: Option<String>,
    pub polimi_ects: Option<String>,
}

impl ColumnMapping {
    /// Guesses every role from the sheet's column names.
    pub fn guess<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut mapping = Self::default();
        for role in ColumnRole::ALL {
            let guess = guess_column(columns, role.candidates());
            debug!(%role, guess = guess.as_deref().unwrap_or("-"), "column guess");
            *mapping.slot_mut(role) = guess;
        }
        mapping
    }

    pub fn get(&self, role: ColumnRole) -> Option<&str> {
        match role {
            ColumnRole::Selection => self.selection.as_deref(),
            ColumnRole::ItbaCode => self.itba_code.as_deref(),
            ColumnRole::ItbaName => self.itba_name.as_deref(),
            ColumnRole::ItbaCredits => self.itba_credits.as_deref(),
            ColumnRole::PolimiCode => self.polimi_code.as_deref(),
            ColumnRole::PolimiName => self.polimi_name.as_deref(),
            ColumnRole::PolimiEcts => self.polimi_ects.as_deref(),
        }
    }

    fn slot_mut(&mut self, role: ColumnRole) -> &mut Option<String> {
        match role {
            ColumnRole::Selection => &mut self.selection,
            ColumnRole::ItbaCode => &mut self.itba_code,
            ColumnRole::ItbaName => &mut self.itba_name,
            ColumnRole::ItbaCredits => &mut self.itba_credits,
            ColumnRole::PolimiCode => &mut self.polimi_code,
            ColumnRole::PolimiName => &mut self.polimi_name,
            ColumnRole::PolimiEcts => &mut self.polimi_ects,
        }
    }

    /// Required roles that have no column assigned.
    pub fn unresolved_roles(&self) -> Vec<ColumnRole> {
        ColumnRole::ALL
            .into_iter()
            .filter(|role| role.is_required() && self.get(*role).is_none())
            .collect()
    }

    /// Resolves every assigned column to its position in the sheet.
    pub fn resolve(&self, sheet: &RawSheet) -> Result<ResolvedMapping> {
        let lookup = |role: ColumnRole| -> Result<Option<usize>> {
            match self.get(role) {
                Some(column) => sheet
                    .column_index(column)
                    .map(Some)
                    .ok_or_else(|| ToolError::UnknownColumn {
                        role,
                        column: column.to_string(),
                    }),
                None => Ok(None),
            }
        };

        let required = |role: ColumnRole| -> Result<usize> {
            lookup(role)?.ok_or_else(|| {
                warn!(%role, "required column is not mapped");
                ToolError::UnresolvedColumn {
                    role,
                    columns: sheet.columns.clone(),
                }
            })
        };

        Ok(ResolvedMapping {
            selection: lookup(ColumnRole::Selection)?,
            itba_code: required(ColumnRole::ItbaCode)?,
            itba_name: required(ColumnRole::ItbaName)?,
            itba_credits: lookup(ColumnRole::ItbaCredits)?,
            polimi_code: required(ColumnRole::PolimiCode)?,
            polimi_name: required(ColumnRole::PolimiName)?,
            polimi_ects: lookup(ColumnRole::PolimiEcts)?,
        })
    }
}

/// User choices that replace guessed columns.
#[derive(Debug, Clone, Default)]
pub struct MappingOverrides {
    pub selection: Option<String>,
    pub no_selection: bool,
    pub itba_code: Option<String>,
    pub itba_name: Option<String>,
    pub itba_credits: Option<String>,
    pub polimi_code: Option<String>,
    pub polimi_name: Option<String>,
    pub polimi_ects: Option<String>,
}

impl MappingOverrides {
    /// Applies the explicit choices on top of `mapping`.
    pub fn apply(self, mut mapping: ColumnMapping) -> ColumnMapping {
        let choices = [
            (ColumnRole::Selection, self.selection),
            (ColumnRole::ItbaCode, self.itba_code),
            (ColumnRole::ItbaName, self.itba_name),
            (ColumnRole::ItbaCredits, self.itba_credits),
            (ColumnRole::PolimiCode, self.polimi_code),
            (ColumnRole::PolimiName, self.polimi_name),
            (ColumnRole::PolimiEcts, self.polimi_ects),
        ];
        for (role, choice) in choices {
            if choice.is_some() {
                *mapping.slot_mut(role) = choice;
            }
        }
        if self.no_selection {
            mapping.selection = None;
        }
        mapping
    }
}

/// Column positions validated against a concrete sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub selection: Option<usize>,
    pub itba_code: usize,
    pub itba_name: usize,
    pub itba_credits: Option<usize>,
    pub polimi_code: usize,
    pub polimi_name: usize,
    pub polimi_ects: Option<usize>,
}

/// Inclusion rule for a selection cell: empty cells and the tokens in
/// [`FALSE_TOKENS`] exclude the row, anything else includes it.
///
/// Only a truly empty string counts as empty; whitespace-only text includes.
pub fn is_included(cell: &CellValue) -> bool {
    match cell {
        CellValue::Empty => false,
        CellValue::Boolean(value) => *value,
        CellValue::Number(value) => *value != 0.0,
        CellValue::Text(value) => {
            !value.is_empty() && !FALSE_TOKENS.contains(&value.trim().to_lowercase().as_str())
        }
    }
}

/// Projects every sheet row into a [`WorkingRow`].
///
/// The result always has one entry per sheet row. Without a selection column
/// every row starts excluded.
pub fn build_working_table(sheet: &RawSheet, mapping: &ColumnMapping) -> Result<Vec<WorkingRow>> {
    let resolved = mapping.resolve(sheet)?;

    let text = |row: &[CellValue], index: Option<usize>| -> String {
        index
            .and_then(|index| row.get(index))
            .map(CellValue::to_text)
            .unwrap_or_default()
    };

    let rows = sheet
        .rows
        .iter()
        .map(|row| WorkingRow {
            itba_code: text(row, Some(resolved.itba_code)),
            itba_name: text(row, Some(resolved.itba_name)),
            itba_credits: text(row, resolved.itba_credits),
            polimi_code: text(row, Some(resolved.polimi_code)),
            polimi_name: text(row, Some(resolved.polimi_name)),
            polimi_ects: text(row, resolved.polimi_ects),
            include: resolved
                .selection
                .and_then(|index| row.get(index))
                .is_some_and(is_included),
        })
        .collect();
    Ok(rows)
}

/// Manual inclusion edits, addressed by 1-based data row number.
#[derive(Debug, Clone, Default)]
pub struct InclusionToggles {
    pub all: bool,
    pub include: Vec<usize>,
    pub exclude: Vec<usize>,
}

impl InclusionToggles {
    /// Applies `all`, then `include`, then `exclude` to `rows`.
    pub fn apply(&self, rows: &mut [WorkingRow]) -> Result<()> {
        let total = rows.len();
        let position = |row: usize| -> Result<usize> {
            if (1..=total).contains(&row) {
                Ok(row - 1)
            } else {
                Err(ToolError::RowOutOfRange { row, rows: total })
            }
        };

        if self.all {
            rows.iter_mut().for_each(|row| row.include = true);
        }
        for row in &self.include {
            rows[position(*row)?].include = true;
        }
        for row in &self.exclude {
            rows[position(*row)?].include = false;
        }
        Ok(())
    }
}
