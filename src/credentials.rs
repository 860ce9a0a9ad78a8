use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    token: Option<String>,
    api_base_url: Option<String>,
    updated_at: Option<i64>,
}

/// Persists the session token between runs.
pub struct CredentialStore {
    path: PathBuf,
    api_base_url: String,
    token_override: Option<String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf, api_base_url: String, token_override: Option<String>) -> Self {
        Self {
            path,
            api_base_url,
            token_override,
        }
    }

    pub fn load_token(&self) -> Result<Option<String>, CredentialError> {
        if let Some(token) = self.token_override.as_deref() {
            if !token.trim().is_empty() {
                return Ok(Some(token.to_string()));
            }
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CredentialError::Io(err)),
        };

        let session: SessionFile = serde_json::from_str(&contents)?;
        if let Some(api_base_url) = session.api_base_url.as_deref() {
            if api_base_url != self.api_base_url {
                return Ok(None);
            }
        }
        Ok(session.token.filter(|token| !token.trim().is_empty()))
    }

    pub fn store_token(&self, token: &str) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }

        let session = SessionFile {
            token: Some(token.to_string()),
            api_base_url: Some(self.api_base_url.clone()),
            updated_at: Some(chrono::Utc::now().timestamp()),
        };
        let payload = serde_json::to_string_pretty(&session)?;
        fs::write(&self.path, payload)?;
        set_permissions(&self.path, 0o600)?;
        Ok(())
    }

    pub fn clear_token(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CredentialError::Io(err)),
        }
    }
}

fn ensure_dir(path: &Path) -> Result<(), io::Error> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(path)?;
    set_permissions(path, 0o700)
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<(), io::Error> {
    Ok(())
}
