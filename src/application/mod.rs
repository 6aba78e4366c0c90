pub mod use_cases;

pub use use_cases::import_csv::CsvImportUseCase;
pub use use_cases::process_record::ProcessRecordUseCase;
pub use use_cases::sheet_preview::SheetPreviewUseCase;
