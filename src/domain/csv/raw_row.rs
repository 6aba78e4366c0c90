/// One tokenized CSV line: positional cells, no typing, no validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source text, for skip diagnostics.
    pub line: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    /// Cell at `idx`, or the empty string when the row is shorter than the
    /// header. Rows are never padded; short rows simply read as empty.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn has_content(&self) -> bool {
        self.cells.iter().any(|cell| !cell.is_empty())
    }
}
