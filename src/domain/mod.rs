pub mod error;
pub mod import;
pub mod record;

// CSV tokenization value objects
pub mod csv;
