// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Byte decoding, tokenization and fuzzy header resolution

pub mod header_resolver;
pub mod tokenizer;

pub use header_resolver::resolve_headers;
pub use tokenizer::{decode_upload, tokenize};
