// 📤 Export Collaborator - downloadable copies of the current catalog
// Read-only; same column layout as the persisted table.

use crate::catalog::Catalog;
use crate::store::COLUMNS;
use anyhow::{anyhow, Context, Result};

/// Serialize the catalog as CSV text, identical in layout to the persisted
/// file. Blank-code rows are never exported.
pub fn to_csv_string(catalog: &Catalog) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut wrote_any = false;
    for entry in catalog.entries() {
        if entry.code.trim().is_empty() {
            continue;
        }
        wtr.serialize(entry)
            .context("Failed to serialize catalog entry")?;
        wrote_any = true;
    }

    if !wrote_any {
        wtr.write_record(COLUMNS)
            .context("Failed to write export header")?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV export: {}", e))?;

    String::from_utf8(bytes).context("Exported CSV was not valid UTF-8")
}

/// Serialize the catalog as pretty-printed JSON
pub fn to_json_string(catalog: &Catalog) -> Result<String> {
    serde_json::to_string_pretty(catalog.entries())
        .context("Failed to serialize catalog to JSON")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, Siglum};

    fn sample_catalog() -> Catalog {
        Catalog::from_entries(vec![
            CatalogEntry::new("AAA123", "Senior Engineer", Siglum::Aai),
            CatalogEntry::new("AAB456", "Staff Engineer", Siglum::Ahi),
        ])
    }

    #[test]
    fn test_csv_export_matches_persisted_layout() {
        let csv = to_csv_string(&sample_catalog()).unwrap();
        let mut lines = csv.lines();

        assert_eq!(lines.next().unwrap(), "Job_Code,Job_Title,Siglum");
        assert_eq!(lines.next().unwrap(), "AAA123,Senior Engineer,AAI");
        assert_eq!(lines.next().unwrap(), "AAB456,Staff Engineer,AHI");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_export_empty_catalog_is_header_only() {
        let csv = to_csv_string(&Catalog::new()).unwrap();
        assert_eq!(csv.trim_end(), "Job_Code,Job_Title,Siglum");
    }

    #[test]
    fn test_csv_export_skips_blank_codes() {
        let mut catalog = sample_catalog();
        catalog.push(CatalogEntry::new("", "Ghost Title", Siglum::Aai));

        let csv = to_csv_string(&catalog).unwrap();
        assert!(!csv.contains("Ghost Title"));
    }

    #[test]
    fn test_json_export() {
        let json = to_json_string(&sample_catalog()).unwrap();
        let parsed: Vec<CatalogEntry> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].code, "AAA123");
        assert_eq!(parsed[1].siglum, Siglum::Ahi);
    }
}
