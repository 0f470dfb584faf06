//! Integration tests for token cache backends.

use std::collections::BTreeMap;

use idsec_core::{AuthMethod, Profile, Token, TokenType};
use idsec_store::{CacheError, FileTokenCache, MemoryTokenCache, TokenCache, cache_entry_key};
use sha2::{Digest, Sha256};

fn sample_token(username: &str, expires_at_ms: u64) -> Token {
    Token {
        token: format!("token-for-{username}"),
        token_type: TokenType::Jwt,
        username: username.to_string(),
        endpoint: "https://tenant.id.example.com".to_string(),
        auth_method: AuthMethod::Interactive,
        expires_at_ms,
        refresh_token: Some("refresh".to_string()),
        metadata: BTreeMap::from([("env".to_string(), "prod".to_string())]),
    }
}

fn exercise_round_trip(cache: &dyn TokenCache) {
    let profile = Profile::new("idsec");
    let token = sample_token("alice", 5_000);

    assert!(
        cache
            .load_token(&profile, "alice")
            .expect("load should succeed")
            .is_none()
    );

    cache
        .save_token(&profile, &token, "alice")
        .expect("save should succeed");
    let loaded = cache
        .load_token(&profile, "alice")
        .expect("load should succeed")
        .expect("token should be present");
    assert_eq!(loaded, token);
}

#[test]
fn token_cache_tests_memory_round_trip_is_lossless() {
    exercise_round_trip(&MemoryTokenCache::new());
}

#[test]
fn token_cache_tests_file_round_trip_is_lossless() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    exercise_round_trip(&FileTokenCache::new(dir.path().join("cache")));
}

#[test]
fn token_cache_tests_postfixes_do_not_collide() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let cache = FileTokenCache::new(dir.path());
    let profile = Profile::new("idsec");

    let first = sample_token("user", 1);
    let second = sample_token("user", 2);
    cache
        .save_token(&profile, &first, "user_a.example.com")
        .expect("save should succeed");
    cache
        .save_token(&profile, &second, "user_b.example.com:8443")
        .expect("save should succeed");

    let loaded_first = cache
        .load_token(&profile, "user_a.example.com")
        .expect("load should succeed");
    let loaded_second = cache
        .load_token(&profile, "user_b.example.com:8443")
        .expect("load should succeed");
    assert_eq!(loaded_first, Some(first));
    assert_eq!(loaded_second, Some(second));
    assert!(
        cache
            .load_token(&Profile::new("other"), "user_a.example.com")
            .expect("load should succeed")
            .is_none()
    );
}

fn exercise_dashed_pairs(cache: &dyn TokenCache) {
    let dashed_profile = Profile::new("a-b");
    let plain_profile = Profile::new("a");

    cache
        .save_token(&dashed_profile, &sample_token("c", 1), "c")
        .expect("save should succeed");
    assert!(
        cache
            .load_token(&plain_profile, "b-c")
            .expect("load should succeed")
            .is_none()
    );

    cache
        .save_token(&plain_profile, &sample_token("b-c", 2), "b-c")
        .expect("save should succeed");
    let dashed = cache
        .load_token(&dashed_profile, "c")
        .expect("load should succeed")
        .expect("token should be present");
    let plain = cache
        .load_token(&plain_profile, "b-c")
        .expect("load should succeed")
        .expect("token should be present");
    assert_eq!(dashed.username, "c");
    assert_eq!(plain.username, "b-c");
}

#[test]
fn token_cache_tests_dashed_names_do_not_collide_in_memory() {
    exercise_dashed_pairs(&MemoryTokenCache::new());
}

#[test]
fn token_cache_tests_dashed_names_do_not_collide_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    exercise_dashed_pairs(&FileTokenCache::new(dir.path()));
}

#[test]
fn token_cache_tests_save_replaces_previous_entry() {
    let cache = MemoryTokenCache::new();
    let profile = Profile::new("idsec");

    cache
        .save_token(&profile, &sample_token("alice", 1), "alice")
        .expect("save should succeed");
    cache
        .save_token(&profile, &sample_token("alice", 2), "alice")
        .expect("save should succeed");

    assert_eq!(cache.len(), 1);
    let loaded = cache
        .load_token(&profile, "alice")
        .expect("load should succeed")
        .expect("token should be present");
    assert_eq!(loaded.expires_at_ms, 2);
}

#[test]
fn token_cache_tests_corrupt_blob_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let cache = FileTokenCache::new(dir.path());
    let profile = Profile::new("idsec");

    cache
        .save_token(&profile, &sample_token("alice", 1), "alice")
        .expect("save should succeed");
    for entry in std::fs::read_dir(dir.path()).expect("cache dir should be readable") {
        let path = entry.expect("entry should be readable").path();
        std::fs::write(path, b"{not json").expect("overwrite should succeed");
    }

    assert!(matches!(
        cache.load_token(&profile, "alice"),
        Err(CacheError::Codec(_))
    ));
}

#[cfg(unix)]
#[test]
fn token_cache_tests_file_entries_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir should be created");
    let cache = FileTokenCache::new(dir.path());
    cache
        .save_token(&Profile::new("idsec"), &sample_token("alice", 1), "alice")
        .expect("save should succeed");

    for entry in std::fs::read_dir(dir.path()).expect("cache dir should be readable") {
        let metadata = entry
            .expect("entry should be readable")
            .metadata()
            .expect("metadata should be readable");
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}

#[cfg(unix)]
#[test]
fn token_cache_tests_stale_temp_file_is_tightened() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir should be created");
    let cache = FileTokenCache::new(dir.path());
    let profile = Profile::new("idsec");
    let digest = Sha256::digest(cache_entry_key(&profile, "alice").as_bytes());
    let stale = dir.path().join(format!("{}.json.tmp", hex::encode(digest)));
    std::fs::write(&stale, b"leftover").expect("stale temp should be written");
    std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644))
        .expect("mode should be set");

    cache
        .save_token(&profile, &sample_token("alice", 1), "alice")
        .expect("save should succeed");

    assert!(!stale.exists());
    let entry = dir.path().join(format!("{}.json", hex::encode(digest)));
    let mode = std::fs::metadata(entry)
        .expect("entry should exist")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}
