use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::ImportSession;
use crate::storage::{load_document, save_document, LoadMode};

pub const MAX_SESSIONS: usize = 10;

/// The most recent import sessions, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportHistory {
    #[serde(default)]
    pub sessions: Vec<ImportSession>,
}

impl ImportHistory {
    pub fn load(path: &Path, mode: LoadMode) -> Result<Self> {
        let mut history: Self = load_document(path, mode)?;
        history.trim();
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_document(path, self)
    }

    /// Append and drop whatever was inserted earliest beyond the cap,
    /// regardless of timestamps.
    pub fn add_session(&mut self, session: ImportSession) {
        self.sessions.push(session);
        self.trim();
    }

    pub fn last_session(&self) -> Option<&ImportSession> {
        self.sessions.last()
    }

    fn trim(&mut self) {
        if self.sessions.len() > MAX_SESSIONS {
            let excess = self.sessions.len() - MAX_SESSIONS;
            self.sessions.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImportStatus;

    fn session(n: usize, timestamp: &str) -> ImportSession {
        ImportSession {
            id: format!("s{n}"),
            file_name: format!("stmt{n}.csv"),
            source: "Chase".to_string(),
            status: ImportStatus::Imported,
            total_count: n,
            imported: n,
            skipped: 0,
            errors: Vec::new(),
            preview: Vec::new(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_empty_history_has_no_last() {
        assert!(ImportHistory::default().last_session().is_none());
    }

    #[test]
    fn test_eleventh_session_evicts_oldest() {
        let mut history = ImportHistory::default();
        for n in 1..=11 {
            history.add_session(session(n, "2025-01-01 00:00:00"));
        }
        assert_eq!(history.sessions.len(), MAX_SESSIONS);
        assert_eq!(history.sessions[0].id, "s2");
        assert_eq!(history.last_session().unwrap().id, "s11");
    }

    #[test]
    fn test_eviction_ignores_timestamps() {
        let mut history = ImportHistory::default();
        history.add_session(session(0, "2030-12-31 23:59:59"));
        for n in 1..=10 {
            history.add_session(session(n, "2020-01-01 00:00:00"));
        }
        assert!(history.sessions.iter().all(|s| s.id != "s0"));
        assert_eq!(history.last_session().unwrap().id, "s10");
    }

    #[test]
    fn test_save_load_roundtrip_uses_sessions_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imports.json");
        let mut history = ImportHistory::default();
        history.add_session(session(1, "2025-01-01 10:00:00"));
        history.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["sessions"][0]["file_name"], "stmt1.csv");
        assert_eq!(raw["sessions"][0]["status"], "imported");

        let loaded = ImportHistory::load(&path, LoadMode::Strict).unwrap();
        assert_eq!(loaded, history);
    }

    #[test]
    fn test_corrupt_history_is_empty_when_lenient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imports.json");
        std::fs::write(&path, "garbage").unwrap();
        assert!(ImportHistory::load(&path, LoadMode::Lenient).unwrap().sessions.is_empty());
        assert!(ImportHistory::load(&path, LoadMode::Strict).is_err());
    }
}
