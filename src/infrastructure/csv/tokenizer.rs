// ============================================================
// CSV TOKENIZER
// ============================================================
// Deliberately naive line/comma splitting. Matching what the
// dashboard upload paths have always accepted means no quoted
// multi-line fields and no embedded-comma escaping; a comma
// inside quotes still splits the cell.

use crate::domain::csv::RawRow;

/// Decode an uploaded byte buffer into text. UTF-8 with BOM sniffing;
/// malformed sequences are replaced rather than rejected.
pub fn decode_upload(bytes: &[u8]) -> String {
    let (text, _, _) = encoding_rs::UTF_8.decode(bytes);
    text.into_owned()
}

/// Split CSV text into rows of trimmed, quote-stripped cells.
///
/// Line numbers count physical lines from 1 so skip diagnostics line up with
/// what the user sees in a text editor. Blank and whitespace-only lines are
/// discarded entirely; they never become rows.
pub fn tokenize(content: &str) -> Vec<RawRow> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut rows = Vec::new();

    for (i, line) in content.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        let cells = line.split(',').map(clean_cell).collect();
        rows.push(RawRow::new(i + 1, cells));
    }

    rows
}

/// Trim the cell, then peel one surrounding quote pair. Quotes inside the
/// cell are left alone.
fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    let cell = cell.strip_prefix('"').unwrap_or(cell);
    let cell = cell.strip_suffix('"').unwrap_or(cell);
    cell.to_string()
}
