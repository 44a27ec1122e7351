// 🔍 Lookup Index - derived read-only view over a catalog snapshot
// Rebuilt by the workflow after every successful mutation; never persisted.

use crate::catalog::{normalize_title, Catalog, CatalogEntry};
use std::collections::HashMap;

/// Read-only lookups backing validation and operator autocomplete.
///
/// Holds its own snapshot of the entries so lookups stay valid while the
/// workflow stages a mutation. Catalogs here are small (an HR job table),
/// so the copy is cheap.
pub struct LookupIndex {
    entries: Vec<CatalogEntry>,
    by_code: HashMap<String, usize>,
    by_title: HashMap<String, Vec<usize>>,
}

impl LookupIndex {
    pub fn build(catalog: &Catalog) -> Self {
        let entries: Vec<CatalogEntry> = catalog.entries().to_vec();

        let mut by_code: HashMap<String, usize> = HashMap::new();
        let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            // First occurrence wins; legacy data may repeat a code
            by_code.entry(entry.code.clone()).or_insert(i);
            by_title
                .entry(normalize_title(&entry.title))
                .or_default()
                .push(i);
        }

        LookupIndex {
            entries,
            by_code,
            by_title,
        }
    }

    /// Case-sensitive prefix match over codes, in catalog order.
    ///
    /// An empty prefix means "no query" and returns nothing, so the
    /// presentation layer never dumps the whole catalog on first keystroke.
    pub fn find_by_code_prefix(&self, prefix: &str) -> Vec<&str> {
        if prefix.is_empty() {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|e| e.code.starts_with(prefix))
            .map(|e| e.code.as_str())
            .collect()
    }

    /// Exact case-sensitive code lookup
    pub fn exact_code(&self, code: &str) -> Option<&CatalogEntry> {
        self.by_code.get(code).map(|&i| &self.entries[i])
    }

    /// All entries whose title matches after trim + lowercase, catalog order.
    ///
    /// Returns every match rather than the first: legacy data may already
    /// hold duplicate titles, and the operator needs to see all of them.
    pub fn exact_title(&self, title: &str) -> Vec<&CatalogEntry> {
        match self.by_title.get(&normalize_title(title)) {
            Some(positions) => positions.iter().map(|&i| &self.entries[i]).collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Siglum;

    fn sample_catalog() -> Catalog {
        Catalog::from_entries(vec![
            CatalogEntry::new("AAA123", "Senior Engineer", Siglum::Aai),
            CatalogEntry::new("AAB456", "Staff Engineer", Siglum::Ahi),
            CatalogEntry::new("BBB789", "senior engineer ", Siglum::Aai),
        ])
    }

    #[test]
    fn test_prefix_search_catalog_order() {
        let index = LookupIndex::build(&sample_catalog());

        let matches = index.find_by_code_prefix("AA");
        assert_eq!(matches, vec!["AAA123", "AAB456"]);
    }

    #[test]
    fn test_prefix_search_empty_prefix_returns_nothing() {
        let index = LookupIndex::build(&sample_catalog());
        assert!(index.find_by_code_prefix("").is_empty());
    }

    #[test]
    fn test_prefix_search_is_case_sensitive() {
        let index = LookupIndex::build(&sample_catalog());
        assert!(index.find_by_code_prefix("aa").is_empty());
    }

    #[test]
    fn test_exact_code() {
        let index = LookupIndex::build(&sample_catalog());

        let entry = index.exact_code("AAA123").unwrap();
        assert_eq!(entry.title, "Senior Engineer");

        assert!(index.exact_code("aaa123").is_none());
        assert!(index.exact_code("ZZZ000").is_none());
    }

    #[test]
    fn test_exact_title_normalizes_both_sides() {
        let index = LookupIndex::build(&sample_catalog());

        // "Senior Engineer" and "senior engineer " share a normalized title
        let matches = index.exact_title("  SENIOR ENGINEER  ");
        let codes: Vec<&str> = matches.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["AAA123", "BBB789"]);
    }

    #[test]
    fn test_exact_title_no_match() {
        let index = LookupIndex::build(&sample_catalog());
        assert!(index.exact_title("Principal Engineer").is_empty());
    }

    #[test]
    fn test_empty_catalog() {
        let index = LookupIndex::build(&Catalog::new());
        assert!(index.is_empty());
        assert!(index.exact_code("AAA123").is_none());
        assert!(index.exact_title("anything").is_empty());
    }
}
