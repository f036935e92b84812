use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::state::ensure_smartspend_home;

/// Provider secrets, kept apart from config.toml so the config can be shared.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthState {
    pub anthropic_token: Option<String>,
    pub openai_api_key: Option<String>,
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_smartspend_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    load_auth_from(&auth_path()?)
}

pub fn load_auth_from(p: &Path) -> Result<AuthState> {
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth_to(auth: &AuthState, p: &Path) -> Result<()> {
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

fn check_prefix(secret: &str, prefix: &str, what: &str) -> Result<()> {
    if !secret.starts_with(prefix) {
        bail!("that didn't look like an {what} (expected prefix {prefix})");
    }
    Ok(())
}

pub fn anthropic_paste_token() -> Result<()> {
    let p = auth_path()?;
    let mut auth = load_auth_from(&p)?;
    let token = prompt_secret("Paste Anthropic API key (starts with sk-ant-)")?;
    check_prefix(&token, "sk-ant-", "Anthropic key")?;
    auth.anthropic_token = Some(token);
    save_auth_to(&auth, &p)?;
    println!("Saved Anthropic key to {}", p.display());
    Ok(())
}

pub fn openai_paste_api_key() -> Result<()> {
    let p = auth_path()?;
    let mut auth = load_auth_from(&p)?;
    let key = prompt_secret("Paste OpenAI API key (starts with sk-)")?;
    check_prefix(&key, "sk-", "OpenAI API key")?;
    auth.openai_api_key = Some(key);
    save_auth_to(&auth, &p)?;
    println!("Saved OpenAI API key to {}", p.display());
    Ok(())
}
