use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// What survives a refresh or a detour into the drawing editor: just enough
/// to ask the server who we are. Everything else is re-derived from the
/// server's snapshot on reattach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub code: String,
    pub nickname: String,
}

/// On-disk stand-in for the browser's local storage.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_location() -> Self {
        let dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: dir.join("arthive").join("relay-session.json"),
        }
    }

    /// `None` on a missing or unreadable file; a corrupt rejoin hint is the
    /// same as no hint.
    pub fn load(&self) -> Option<SavedSession> {
        let raw = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn save(&self, saved: &SavedSession) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(saved)?;
        fs::write(&self.path, raw)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}
