use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;
use super::session::Session;

const SESSION_FILE_NAME: &str = "session.json";
const SESSION_FILE_VERSION: u32 = 1;

/// Storage abstraction for the single persisted session.
pub trait SessionStore: Send + Sync {
    /// Returns `None` when nothing is stored or the stored record is unreadable.
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// Configuration for file-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub base_dir: PathBuf,
}

impl SessionStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_tasklease_dir()
    }
}

/// File-backed session store writing one JSON record.
///
/// Writes go through a temp file and a rename so a crash mid-write never
/// leaves a partial record behind.
///
/// # Example
/// ```no_run
/// use tasklease::auth::{FileSessionStore, Session, SessionStore};
///
/// let store = FileSessionStore::new_default();
/// store.save(&Session::default().with_access_token("access", None))?;
/// # Ok::<(), tasklease::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_tasklease_dir(),
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.base_dir.join(SESSION_FILE_NAME)
    }

    fn discard(&self, path: &Path) {
        if let Err(err) = fs::remove_file(path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %err, "failed to discard unreadable session");
            }
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<Session> {
        let path = self.session_path();
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!(path = %path.display(), error = %err, "stored session is not UTF-8, discarding");
                self.discard(&path);
                return None;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read session");
                return None;
            }
        };
        if raw.trim().is_empty() {
            tracing::warn!(path = %path.display(), "stored session is empty, discarding");
            self.discard(&path);
            return None;
        }
        match serde_json::from_str::<SessionFile>(&raw) {
            Ok(file) if file.version == SESSION_FILE_VERSION => Some(file.session),
            Ok(file) => {
                tracing::warn!(version = file.version, "unsupported session file version, discarding");
                self.discard(&path);
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "stored session is corrupt, discarding");
                self.discard(&path);
                None
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), AuthError> {
        let file = SessionFile {
            version: SESSION_FILE_VERSION,
            session: session.clone(),
            saved_at: Utc::now(),
        };
        let serialized = serde_json::to_vec_pretty(&file)?;
        atomic_write(&self.session_path(), &serialized)
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(self.session_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    session: Session,
    saved_at: DateTime<Utc>,
}

fn default_tasklease_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".tasklease"))
        .unwrap_or_else(|| PathBuf::from(".tasklease"))
}

/// Replace the session file without ever exposing a half-written record.
///
/// The record lands in an owner-only sibling temp file, is synced, then
/// renamed over `path`. The temp file is removed on any failure.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AuthError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_file_name(format!(
        ".{SESSION_FILE_NAME}.{}.tmp",
        Uuid::new_v4().simple()
    ));

    let written = write_synced(&temp_path, data).and_then(|()| fs::rename(&temp_path, path));
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
