//! Core library for the `gran-dt` command line application.
//!
//! The tool turns a shared spreadsheet of course equivalences between ITBA and
//! POLIMI into a proposal document. Link retrieval lives in
//! [`lagrandt::equivalences::fetch`], workbook parsing and the document and CSV
//! writers under [`lagrandt::equivalences::io`], column guessing and row
//! selection in [`lagrandt::equivalences::mapping`], and the end-to-end flow in
//! [`lagrandt::equivalences::pipeline`].

pub mod lagrandt;

pub use lagrandt::equivalences::{
    Result, ToolError, error, fetch, io, mapping, model, pipeline,
};
