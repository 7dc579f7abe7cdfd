//! Session persistence
//!
//! Stores the current session as JSON so the CLI stays signed in between
//! invocations.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{AuthError, Session};

/// Session file on disk
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session, expired or not
    pub fn load(&self) -> Result<Option<Session>, AuthError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AuthError::SessionFile {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Replace the stored session
    ///
    /// The file holds bearer tokens, so it is written owner-only through a
    /// temp file and renamed into place.
    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| AuthError::SessionFile {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(session)?;

        let temp_path = self.path.with_extension("tmp");
        let file_error = |source| AuthError::SessionFile {
            path: temp_path.clone(),
            source,
        };
        let mut file = private_file(&temp_path).map_err(file_error)?;
        file.write_all(json.as_bytes()).map_err(file_error)?;
        file.sync_all().map_err(file_error)?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            AuthError::SessionFile {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Forget the stored session
    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AuthError::SessionFile {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Create (or truncate) a file readable only by its owner
fn private_file(path: &Path) -> io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;
    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}
