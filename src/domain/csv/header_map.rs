use crate::domain::record::CanonicalField;

/// Canonical field to column index bindings for one import.
///
/// Built once per import from the header row and immutable afterwards. Each
/// column index is bound to at most one field; `is_claimed` is how the
/// resolver keeps later fields off columns an earlier field already took.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    slots: [Option<usize>; 6],
}

impl HeaderMap {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.slots[field.index()]
    }

    pub fn bind(&mut self, field: CanonicalField, idx: usize) {
        self.slots[field.index()] = Some(idx);
    }

    pub fn is_claimed(&self, idx: usize) -> bool {
        self.slots.contains(&Some(idx))
    }

    pub fn resolved_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// (field, column) pairs for logging, in field priority order.
    pub fn bindings(&self) -> Vec<(CanonicalField, usize)> {
        CanonicalField::ALL
            .iter()
            .filter_map(|field| self.get(*field).map(|idx| (*field, idx)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_get() {
        let mut map = HeaderMap::default();
        map.bind(CanonicalField::Email, 2);
        assert_eq!(map.get(CanonicalField::Email), Some(2));
        assert_eq!(map.get(CanonicalField::FirstName), None);
        assert_eq!(map.resolved_count(), 1);
    }

    #[test]
    fn test_is_claimed() {
        let mut map = HeaderMap::default();
        map.bind(CanonicalField::FirstName, 0);
        assert!(map.is_claimed(0));
        assert!(!map.is_claimed(1));
    }

    #[test]
    fn test_bindings_follow_field_priority() {
        let mut map = HeaderMap::default();
        map.bind(CanonicalField::Notes, 1);
        map.bind(CanonicalField::FirstName, 4);
        assert_eq!(
            map.bindings(),
            vec![(CanonicalField::FirstName, 4), (CanonicalField::Notes, 1)]
        );
    }
}
