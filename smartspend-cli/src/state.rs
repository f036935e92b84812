use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$SMARTSPEND_HOME`, or `~/.smartspend`.
pub fn smartspend_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SMARTSPEND_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".smartspend"))
}

pub fn ensure_smartspend_home() -> Result<PathBuf> {
    let dir = smartspend_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Directory holding one JSON document per user.
pub fn data_dir() -> Result<PathBuf> {
    let dir = ensure_smartspend_home()?.join("data");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn session_path() -> Result<PathBuf> {
    Ok(ensure_smartspend_home()?.join("session.json"))
}
