#![warn(missing_docs)]
//! # idsec-store
//!
//! ## Purpose
//! Defines the persistence contracts the authentication core consumes: a
//! token cache and a profile store, plus reference backends for both.
//!
//! ## Responsibilities
//! - Expose the narrow [`TokenCache`] load/save contract keyed by
//!   `(profile, key postfix)`.
//! - Provide [`MemoryTokenCache`] for tests and short-lived processes.
//! - Provide [`FileTokenCache`] for persistence across process invocations.
//! - Expose [`ProfileStore`] and the JSON-directory [`FileProfileStore`].
//!
//! ## Data flow
//! `AuthSession` derives a key postfix -> [`TokenCache::load_token`] returns a
//! decoded [`idsec_core::Token`] or `None` -> after login/refresh the session
//! calls [`TokenCache::save_token`] with the new token.
//!
//! ## Ownership and lifetimes
//! Backends own their storage. Loaded tokens are decoded into owned values, so
//! a cache entry may be overwritten while a caller still holds an older token.
//!
//! ## Error model
//! I/O and codec failures surface as [`CacheError`] / [`ProfileError`]. The
//! caller decides whether a failure is fatal.
//!
//! ## Security and privacy notes
//! Token blobs are bearer material. The file backend writes them with owner-only
//! permissions on Unix and never logs blob contents.

mod profiles;
mod token_cache;

pub use profiles::{DEFAULT_PROFILE_NAME, FileProfileStore, ProfileError, ProfileStore};
pub use token_cache::{CacheError, FileTokenCache, MemoryTokenCache, TokenCache, cache_entry_key};
