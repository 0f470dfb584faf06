//! Profile store contract and the JSON-directory backend.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use idsec_core::{CoreError, Profile};
use thiserror::Error;
use tracing::debug;

/// Profile name used when nothing else selects one.
pub const DEFAULT_PROFILE_NAME: &str = "idsec";

/// Source of named profiles.
pub trait ProfileStore: Send + Sync {
    /// Loads the profile called `name`.
    ///
    /// # Errors
    /// Returns [`ProfileError::NotFound`] when no such profile exists.
    fn load_profile(&self, name: &str) -> Result<Profile, ProfileError>;

    /// Loads the store's default profile.
    ///
    /// # Errors
    /// Returns [`ProfileError`] when the default profile cannot be loaded.
    fn load_default_profile(&self) -> Result<Profile, ProfileError>;
}

/// Stores each profile as `<dir>/<profile_name>.json`.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    dir: PathBuf,
    default_profile_name: String,
}

impl FileProfileStore {
    /// Creates a store rooted at `dir` with the given default profile name.
    pub fn new(dir: impl Into<PathBuf>, default_profile_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            default_profile_name: default_profile_name.into(),
        }
    }

    /// Returns the profile directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the name [`ProfileStore::load_default_profile`] resolves.
    pub fn default_profile_name(&self) -> &str {
        &self.default_profile_name
    }

    /// Writes `profile` to `<dir>/<profile_name>.json`.
    ///
    /// # Errors
    /// Returns [`ProfileError::InvalidName`] for names that would escape the
    /// directory, and [`ProfileError::Io`] / [`ProfileError::Codec`] on write
    /// or encode failure.
    pub fn save_profile(&self, profile: &Profile) -> Result<(), ProfileError> {
        let path = self.profile_path(&profile.profile_name)?;
        fs::create_dir_all(&self.dir)?;
        let raw = profile.to_json_bytes().map_err(ProfileError::Codec)?;
        fs::write(path, raw)?;
        Ok(())
    }

    fn profile_path(&self, name: &str) -> Result<PathBuf, ProfileError> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.contains(['/', '\\'])
            || trimmed == "."
            || trimmed == ".."
        {
            return Err(ProfileError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{trimmed}.json")))
    }
}

impl ProfileStore for FileProfileStore {
    fn load_profile(&self, name: &str) -> Result<Profile, ProfileError> {
        let path = self.profile_path(name)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(ProfileError::NotFound(name.to_string()));
            }
            Err(error) => return Err(ProfileError::Io(error)),
        };

        let profile = Profile::from_json_bytes(&raw).map_err(ProfileError::Codec)?;
        debug!(
            profile = %profile.profile_name,
            auth_profiles = profile.auth_profiles.len(),
            "loaded profile"
        );
        Ok(profile)
    }

    fn load_default_profile(&self) -> Result<Profile, ProfileError> {
        self.load_profile(&self.default_profile_name)
    }
}

/// Profile store failures.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No profile with this name exists.
    #[error("profile not found: {0}")]
    NotFound(String),
    /// Profile name cannot be mapped to a storage location.
    #[error("invalid profile name: {0:?}")]
    InvalidName(String),
    /// Storage could not be read or written.
    #[error("profile i/o failure: {0}")]
    Io(#[from] io::Error),
    /// Profile document is malformed.
    #[error("profile codec failure: {0}")]
    Codec(CoreError),
}

#[cfg(test)]
mod tests {
    //! Unit tests for profile path policy.

    use super::*;

    #[test]
    fn rejects_names_escaping_the_directory() {
        let store = FileProfileStore::new("/tmp/profiles", DEFAULT_PROFILE_NAME);
        for name in ["", " ", "..", "../etc/passwd", "a\\b"] {
            assert!(
                matches!(store.profile_path(name), Err(ProfileError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(store.profile_path("work").is_ok());
    }
}
