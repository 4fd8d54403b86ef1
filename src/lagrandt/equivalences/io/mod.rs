pub mod csv_write;
pub mod docx_write;
pub mod sheet_read;
