use csv::WriterBuilder;

use crate::lagrandt::equivalences::error::{Result, ToolError};
use crate::lagrandt::equivalences::model::{FIELD_NAMES, WorkingRow};

pub const CSV_FILE_NAME: &str = "seleccion.csv";
pub const CSV_MIME: &str = "text/csv";

/// Serialises `rows` as comma-separated UTF-8 text with a header row, even
/// when there are no rows.
pub fn render_flat_export(rows: &[WorkingRow]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(FIELD_NAMES)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|error| ToolError::Io(error.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, name: &str) -> WorkingRow {
        WorkingRow {
            itba_code: code.to_string(),
            itba_name: name.to_string(),
            itba_credits: "6".to_string(),
            polimi_code: "054321".to_string(),
            polimi_name: "Algorithms, advanced".to_string(),
            polimi_ects: String::new(),
            include: true,
        }
    }

    #[test]
    fn empty_selection_still_has_header() {
        let bytes = render_flat_export(&[]).expect("rendered");
        assert_eq!(
            String::from_utf8(bytes).expect("utf-8"),
            "itba_code,itba_name,itba_credits,polimi_code,polimi_name,polimi_ects\n"
        );
    }

    #[test]
    fn export_reads_back_identically() {
        let rows = vec![row("93.41", "Física \"I\""), row("72.11", "Química")];
        let bytes = render_flat_export(&rows).expect("rendered");

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().expect("header row").clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), FIELD_NAMES);

        let restored: Vec<WorkingRow> = reader
            .deserialize()
            .collect::<std::result::Result<_, _>>()
            .expect("rows parsed");
        assert_eq!(restored.len(), rows.len());
        for (restored, original) in restored.iter().zip(&rows) {
            assert_eq!(restored.fields(), original.fields());
        }
    }
}
