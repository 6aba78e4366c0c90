// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Value objects shared by the tokenizer and the header resolver
// No I/O, no async, no external dependencies

mod header_map;
mod raw_row;

pub use header_map::HeaderMap;
pub use raw_row::RawRow;
