// 📝 Audit Trail - append-only mutation journal
// Every successful catalog change is an event: id, timestamp, action, payload.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub data: serde_json::Value,
}

impl AuditEvent {
    pub fn new(action: &str, data: serde_json::Value) -> Self {
        AuditEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action: action.to_string(),
            data,
        }
    }
}

/// JSON-lines journal next to the catalog file.
///
/// Best-effort: the workflow records events after a successful save and
/// ignores journal write failures, so auditing never blocks a mutation.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AuditLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, event: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(event).context("Failed to serialize audit event")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit log at {}", self.path.display()))?;

        writeln!(file, "{}", line).context("Failed to append audit event")?;

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_record_appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.jsonl"));

        log.record(&AuditEvent::new(
            "entry_added",
            serde_json::json!({"code": "AAA123"}),
        ))
        .unwrap();
        log.record(&AuditEvent::new(
            "entries_removed",
            serde_json::json!({"codes": ["AAA123"]}),
        ))
        .unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.action, "entry_added");
        assert_eq!(first.data["code"], "AAA123");
        assert!(!first.event_id.is_empty());

        let second: AuditEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.action, "entries_removed");
    }
}
