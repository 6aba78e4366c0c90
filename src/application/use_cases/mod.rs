pub mod import_csv;
pub mod process_record;
pub mod sheet_preview;
