use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use gran_dt_equivalences::ToolError;
use gran_dt_equivalences::io::csv_write::CSV_FILE_NAME;
use gran_dt_equivalences::io::docx_write::DOCX_FILE_NAME;
use gran_dt_equivalences::io::sheet_read::Workbook;
use gran_dt_equivalences::mapping::{InclusionToggles, MappingOverrides};
use gran_dt_equivalences::model::{CellValue, DocumentHeader};
use gran_dt_equivalences::pipeline::{self, GenerateOptions, Source};
use rust_xlsxwriter::Workbook as XlsxBuilder;
use tempfile::tempdir;

const HEADERS: [&str; 7] = [
    "Cod ITBA",
    "Materia",
    "Creditos ITBA",
    "Cod POLIMI",
    "Description",
    "ECTS",
    "Incluir",
];

fn write_scenario_workbook(path: &Path) {
    let mut workbook = XlsxBuilder::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Equivalencias").expect("sheet named");
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).expect("header written");
    }

    let rows = [
        ("93.41", "Algoritmos", 6.0, "054321", "Algorithms", 8.0, "1"),
        ("72.11", "Física", 3.0, "099887", "Physics", 5.0, "no"),
    ];
    for (index, row) in rows.iter().enumerate() {
        let r = (index + 1) as u32;
        sheet.write_string(r, 0, row.0).expect("cell written");
        sheet.write_string(r, 1, row.1).expect("cell written");
        sheet.write_number(r, 2, row.2).expect("cell written");
        sheet.write_string(r, 3, row.3).expect("cell written");
        sheet.write_string(r, 4, row.4).expect("cell written");
        sheet.write_number(r, 5, row.5).expect("cell written");
        sheet.write_string(r, 6, row.6).expect("cell written");
    }

    let notes = workbook.add_worksheet();
    notes.set_name("Notas").expect("sheet named");
    notes.write_string(0, 0, "Comentario").expect("cell written");

    workbook.save(path).expect("workbook saved");
}

fn document_xml(bytes: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid docx");
    let mut part = archive.by_name("word/document.xml").expect("document part");
    let mut xml = String::new();
    part.read_to_string(&mut xml).expect("utf-8 xml");
    xml
}

#[test]
fn workbook_sheets_and_cells_are_read() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("equivalencias.xlsx");
    write_scenario_workbook(&path);

    let bytes = fs::read(&path).expect("workbook bytes");
    let mut workbook = Workbook::from_bytes(bytes).expect("workbook opened");
    assert_eq!(workbook.sheet_names(), ["Equivalencias", "Notas"]);
    assert_eq!(
        workbook.resolve_sheet_name(None).expect("default sheet"),
        "Equivalencias"
    );

    let sheet = workbook.read_sheet("Equivalencias").expect("sheet parsed");
    assert_eq!(sheet.columns, HEADERS);
    assert_eq!(sheet.rows.len(), 2);
    assert_eq!(sheet.rows[0][2], CellValue::Number(6.0));
    assert_eq!(sheet.rows[1][6], CellValue::Text("no".into()));

    let missing = workbook
        .resolve_sheet_name(Some("Hoja1"))
        .expect_err("unknown sheet");
    assert!(matches!(missing, ToolError::MissingSheet { .. }));
    assert!(missing.is_read_failure());
}

#[test]
fn scenario_generates_document_and_export_for_included_rows() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("equivalencias.xlsx");
    write_scenario_workbook(&path);

    let loaded = pipeline::load_sheet(&Source::File(path), None).expect("sheet loaded");
    let inspection =
        pipeline::inspect(&loaded, MappingOverrides::default()).expect("inspection built");
    assert_eq!(inspection.row_count, 2);
    assert!(inspection.unresolved.is_empty());
    assert_eq!(
        inspection.rows.iter().map(|row| row.include).collect::<Vec<_>>(),
        [true, false]
    );

    let options = GenerateOptions {
        header: DocumentHeader {
            student: Some("Ana Pérez".into()),
            id: Some("61234".into()),
            program: None,
            term: Some("2025-2C".into()),
        },
        ..Default::default()
    };
    let outputs = pipeline::render_selection(&loaded, options).expect("outputs rendered");
    assert_eq!(outputs.rows, 1);

    let out_dir = dir.path().join("out");
    let written = pipeline::write_outputs(&outputs, &out_dir).expect("outputs written");
    assert_eq!(written.document, out_dir.join(DOCX_FILE_NAME));
    assert_eq!(written.export, out_dir.join(CSV_FILE_NAME));

    let xml = document_xml(&fs::read(&written.document).expect("docx read"));
    assert_eq!(xml.matches("<w:tr>").count(), 2);
    assert!(xml.contains("Algoritmos"));
    assert!(!xml.contains("Física"));
    assert!(xml.contains("Alumno: Ana Pérez  "));
    assert!(xml.contains("Legajo: 61234  "));
    assert!(!xml.contains("Carrera:"));
    assert!(xml.contains("Período: 2025-2C"));

    let csv = fs::read_to_string(&written.export).expect("csv read");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        [
            "itba_code,itba_name,itba_credits,polimi_code,polimi_name,polimi_ects",
            "93.41,Algoritmos,6,054321,Algorithms,8",
        ]
    );
}

#[test]
fn toggles_and_overrides_change_the_selection() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("equivalencias.xlsx");
    write_scenario_workbook(&path);
    let loaded = pipeline::load_sheet(&Source::File(path), None).expect("sheet loaded");

    let options = GenerateOptions {
        overrides: MappingOverrides {
            no_selection: true,
            polimi_ects: Some("Creditos ITBA".into()),
            ..Default::default()
        },
        toggles: InclusionToggles {
            include: vec![2],
            ..Default::default()
        },
        ..Default::default()
    };
    let outputs = pipeline::render_selection(&loaded, options).expect("outputs rendered");
    let csv = String::from_utf8(outputs.export).expect("utf-8 csv");
    assert_eq!(csv.lines().nth(1), Some("72.11,Física,3,099887,Physics,3"));
    assert_eq!(csv.lines().count(), 2);
}

#[test]
fn empty_selection_is_refused() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("equivalencias.xlsx");
    write_scenario_workbook(&path);
    let loaded = pipeline::load_sheet(&Source::File(path), None).expect("sheet loaded");

    let options = GenerateOptions {
        toggles: InclusionToggles {
            exclude: vec![1],
            ..Default::default()
        },
        ..Default::default()
    };
    let error = pipeline::render_selection(&loaded, options).expect_err("nothing selected");
    assert!(matches!(error, ToolError::NothingSelected));
}

#[test]
fn unmatched_columns_are_left_for_the_user() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("otra.xlsx");
    let mut workbook = XlsxBuilder::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Foo").expect("cell written");
    sheet.write_string(0, 1, "Bar").expect("cell written");
    sheet.write_string(1, 0, "a").expect("cell written");
    workbook.save(&path).expect("workbook saved");

    let loaded = pipeline::load_sheet(&Source::File(path), None).expect("sheet loaded");
    let inspection =
        pipeline::inspect(&loaded, MappingOverrides::default()).expect("inspection built");
    assert_eq!(inspection.unresolved.len(), 4);
    assert!(inspection.rows.is_empty());
    assert_eq!(inspection.row_count, 1);

    let error = pipeline::render_selection(&loaded, GenerateOptions::default())
        .expect_err("mapping unresolved");
    assert!(matches!(error, ToolError::UnresolvedColumn { .. }));
    assert!(!error.is_read_failure());
}

#[test]
fn missing_file_is_a_read_failure() {
    let dir = tempdir().expect("temporary directory");
    let error = pipeline::load_sheet(&Source::File(dir.path().join("absent.xlsx")), None)
        .expect_err("missing file");
    assert!(matches!(error, ToolError::MissingInput(_)));
    assert!(error.is_read_failure());
}

#[test]
fn failed_export_leaves_no_partial_outputs() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("equivalencias.xlsx");
    write_scenario_workbook(&path);
    let loaded = pipeline::load_sheet(&Source::File(path), None).expect("sheet loaded");
    let outputs =
        pipeline::render_selection(&loaded, GenerateOptions::default()).expect("outputs rendered");

    let out_dir = dir.path().join("out");
    fs::create_dir_all(out_dir.join(CSV_FILE_NAME)).expect("blocking directory created");

    let error = pipeline::write_outputs(&outputs, &out_dir).expect_err("export blocked");
    assert!(matches!(error, ToolError::Io(_)));
    assert!(!out_dir.join(DOCX_FILE_NAME).exists());

    let entries: Vec<String> = fs::read_dir(&out_dir)
        .expect("out dir listed")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(entries, [CSV_FILE_NAME]);
}
