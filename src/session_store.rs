//! Persisted identity store
//!
//! The store holds the few keys that survive across invocations: the
//! user's mobile number, the auth bearer token, and the cached display
//! name. It is an explicit context object handed to the gateway and the
//! session controller at construction, not ambient global state. All
//! keys are cleared together on logout and only on logout.

use crate::error::{FindastroError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

/// Environment variable overriding the session file location
///
/// This makes it easy to point the binary at a test file or alternate
/// location without changing the user's application data dir.
pub const SESSION_FILE_ENV: &str = "FINDASTRO_SESSION_FILE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,
}

/// On-disk key-value store for the logged-in identity
///
/// Backed by one JSON file in the platform data directory. Reads are
/// served from memory; every mutation rewrites the file so a concurrent
/// `findastro` invocation observes the latest identity. `clear()` deletes
/// the file, so every subsequent `get` returns absent.
pub struct SessionStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl SessionStore {
    /// Open the store at its default location
    ///
    /// Honors the `FINDASTRO_SESSION_FILE` override when set.
    pub fn open() -> Result<Self> {
        if let Ok(override_path) = std::env::var(SESSION_FILE_ENV) {
            return Self::open_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "findastro", "findastro")
            .ok_or_else(|| FindastroError::Store("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| FindastroError::Store(format!("Failed to create data directory: {}", e)))?;

        Self::open_with_path(data_dir.join("session.json"))
    }

    /// Open the store at a specific path
    ///
    /// Primarily useful for tests where the default application data
    /// directory is not desirable (for example, a temporary directory).
    ///
    /// # Examples
    ///
    /// ```
    /// use findastro::session_store::SessionStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SessionStore::open_with_path(dir.path().join("session.json")).unwrap();
    /// assert!(store.mobile().is_none());
    /// ```
    pub fn open_with_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FindastroError::Store(format!("Failed to create session directory: {}", e))
            })?;
        }

        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Session file at {} is corrupt ({}), resetting", path.display(), e);
                StoreData::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => {
                return Err(
                    FindastroError::Store(format!("Failed to read session file: {}", e)).into(),
                )
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Stored mobile number, if any
    pub fn mobile(&self) -> Option<String> {
        self.data.read().ok().and_then(|d| d.mobile.clone())
    }

    /// Stored bearer token, if any
    pub fn token(&self) -> Option<String> {
        self.data.read().ok().and_then(|d| d.token.clone())
    }

    /// Cached display name, if any
    pub fn user_name(&self) -> Option<String> {
        self.data.read().ok().and_then(|d| d.user_name.clone())
    }

    /// True when both a mobile number and a token are stored
    pub fn is_logged_in(&self) -> bool {
        let Ok(data) = self.data.read() else {
            return false;
        };
        data.mobile.is_some() && data.token.is_some()
    }

    /// Store the mobile number
    pub fn set_mobile(&self, mobile: impl Into<String>) -> Result<()> {
        self.mutate(|d| d.mobile = Some(mobile.into()))
    }

    /// Store the bearer token
    ///
    /// The gateway holds a reference to this store and attaches the token
    /// to every subsequent outbound request until `clear()`.
    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        self.mutate(|d| d.token = Some(token.into()))
    }

    /// Cache the display name reported by the backend
    pub fn set_user_name(&self, name: impl Into<String>) -> Result<()> {
        self.mutate(|d| d.user_name = Some(name.into()))
    }

    /// Remove all keys
    ///
    /// Deletes the backing file; every subsequent `get` returns absent.
    /// Logout is the only caller.
    pub fn clear(&self) -> Result<()> {
        {
            let mut data = self
                .data
                .write()
                .map_err(|_| FindastroError::Store("session store lock poisoned".into()))?;
            *data = StoreData::default();
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(FindastroError::Store(format!("Failed to remove session file: {}", e)).into())
            }
        }
    }

    fn mutate<F: FnOnce(&mut StoreData)>(&self, f: F) -> Result<()> {
        let snapshot = {
            let mut data = self
                .data
                .write()
                .map_err(|_| FindastroError::Store("session store lock poisoned".into()))?;
            f(&mut data);
            data.clone()
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, json)
            .map_err(|e| FindastroError::Store(format!("Failed to write session file: {}", e)))?;
        Ok(())
    }
}
