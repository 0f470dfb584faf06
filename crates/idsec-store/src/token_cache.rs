//! Token cache contract and backends.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use idsec_core::{CoreError, Profile, Token};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Secure key-value store holding serialized tokens.
///
/// Neither operation is atomic across process crashes; callers re-check
/// expiry after every load.
pub trait TokenCache: Send + Sync {
    /// Loads the token stored for `(profile, key_postfix)`.
    ///
    /// # Errors
    /// Returns [`CacheError`] when the backend cannot be read or the stored
    /// blob cannot be decoded.
    fn load_token(
        &self,
        profile: &Profile,
        key_postfix: &str,
    ) -> Result<Option<Token>, CacheError>;

    /// Stores `token` under `(profile, key_postfix)`, replacing any prior entry.
    ///
    /// # Errors
    /// Returns [`CacheError`] when the token cannot be encoded or written.
    fn save_token(
        &self,
        profile: &Profile,
        token: &Token,
        key_postfix: &str,
    ) -> Result<(), CacheError>;
}

/// Builds the backend entry key for `(profile, key_postfix)`.
///
/// The profile name is length-prefixed so distinct pairs never share a key.
pub fn cache_entry_key(profile: &Profile, key_postfix: &str) -> String {
    format!(
        "{}:{}{}",
        profile.profile_name.len(),
        profile.profile_name,
        key_postfix
    )
}

/// In-process cache storing encoded blobs.
///
/// Entries go through the same codec as the file backend so round trips are
/// exercised even without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryTokenCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns `true` when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenCache for MemoryTokenCache {
    fn load_token(
        &self,
        profile: &Profile,
        key_postfix: &str,
    ) -> Result<Option<Token>, CacheError> {
        let key = cache_entry_key(profile, key_postfix);
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries
            .get(&key)
            .map(|blob| Token::from_json_bytes(blob).map_err(CacheError::Codec))
            .transpose()
    }

    fn save_token(
        &self,
        profile: &Profile,
        token: &Token,
        key_postfix: &str,
    ) -> Result<(), CacheError> {
        let key = cache_entry_key(profile, key_postfix);
        let blob = token.to_json_bytes().map_err(CacheError::Codec)?;
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key, blob);
        Ok(())
    }
}

/// Directory-backed cache with one JSON file per entry.
///
/// # Layout
/// Files are named by the SHA-256 hex digest of the entry key so usernames
/// and endpoints never appear in file names.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    dir: PathBuf,
}

impl FileTokenCache {
    /// Creates a cache rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, profile: &Profile, key_postfix: &str) -> PathBuf {
        let digest = Sha256::digest(cache_entry_key(profile, key_postfix).as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

impl TokenCache for FileTokenCache {
    fn load_token(
        &self,
        profile: &Profile,
        key_postfix: &str,
    ) -> Result<Option<Token>, CacheError> {
        let path = self.entry_path(profile, key_postfix);
        let blob = match fs::read(&path) {
            Ok(blob) => blob,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(profile = %profile.profile_name, "no cached token entry");
                return Ok(None);
            }
            Err(error) => return Err(CacheError::Io(error)),
        };

        Token::from_json_bytes(&blob)
            .map(Some)
            .map_err(CacheError::Codec)
    }

    fn save_token(
        &self,
        profile: &Profile,
        token: &Token,
        key_postfix: &str,
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(profile, key_postfix);
        let tmp = path.with_extension("json.tmp");
        let blob = token.to_json_bytes().map_err(CacheError::Codec)?;

        let mut file = create_private(&tmp)?;
        file.write_all(&blob)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &path)?;

        debug!(profile = %profile.profile_name, "cached token entry written");
        Ok(())
    }
}

/// Opens `path` for writing, owner-only from the moment it exists on Unix.
fn create_private(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        options.mode(0o600);
        let file = options.open(path)?;
        // A stale temp file keeps its old mode; tighten it before writing.
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        Ok(file)
    }
    #[cfg(not(unix))]
    {
        options.open(path)
    }
}

/// Token cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend storage could not be read or written.
    #[error("token cache i/o failure: {0}")]
    Io(#[from] io::Error),
    /// Stored blob is not a valid token.
    #[error("token cache codec failure: {0}")]
    Codec(CoreError),
    /// A writer panicked while holding the cache lock.
    #[error("token cache lock poisoned")]
    Poisoned,
    /// Backend-specific failure.
    #[error("token cache backend failure: {0}")]
    Backend(String),
}
