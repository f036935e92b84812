use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use smartspend_intake::AuthSession;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub user_id: String,
    pub display_name: String,
}

/// A single-device identity stored in `session.json`.
///
/// The user id is derived from the display name so signing back in with the
/// same name finds the same data.
#[derive(Debug)]
pub struct LocalSession {
    path: PathBuf,
    current: Mutex<Option<SessionFile>>,
}

impl LocalSession {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = read_session(&path)?;
        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    pub fn login(&self, name: &str) -> Result<SessionFile> {
        let id = user_id_for(name)?;
        let s = SessionFile {
            user_id: id,
            display_name: name.trim().to_string(),
        };
        let body = serde_json::to_string_pretty(&s)?;
        fs::write(&self.path, body).with_context(|| format!("write {}", self.path.display()))?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(s.clone());
        Ok(s)
    }
}

fn read_session(p: &Path) -> Result<Option<SessionFile>> {
    if !p.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    let parsed = serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))?;
    Ok(Some(parsed))
}

/// Lowercase ASCII slug of the name, e.g. "Asha Rao" -> "asha-rao".
pub fn user_id_for(name: &str) -> Result<String> {
    let slug = name
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        bail!("name must contain at least one letter or digit");
    }
    Ok(slug)
}

impl AuthSession for LocalSession {
    fn user_id(&self) -> Option<String> {
        let s = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        s.as_ref().map(|s| s.user_id.clone())
    }

    fn display_name(&self) -> Option<String> {
        let s = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        s.as_ref().map(|s| s.display_name.clone())
    }

    fn sign_out(&self) -> Result<()> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| format!("remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_slug() {
        assert_eq!(user_id_for("  Asha Rao ").unwrap(), "asha-rao");
        assert_eq!(user_id_for("dev_01").unwrap(), "dev-01");
        assert!(user_id_for(" !! ").is_err());
    }

    #[test]
    fn test_login_persists_and_logout_clears() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("session.json");

        let s = LocalSession::open(&p).unwrap();
        assert_eq!(s.user_id(), None);
        s.login("Asha").unwrap();
        assert_eq!(s.user_id().as_deref(), Some("asha"));

        let again = LocalSession::open(&p).unwrap();
        assert_eq!(again.display_name().as_deref(), Some("Asha"));

        again.sign_out().unwrap();
        assert!(!p.exists());
        assert_eq!(again.user_id(), None);
        // signing out twice is fine
        again.sign_out().unwrap();
    }
}
