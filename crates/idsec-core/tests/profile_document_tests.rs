//! Tests profile document decoding and auth-profile lookup.

use idsec_core::{AuthMethod, AuthMethodSettings, AuthProfile, InteractiveSettings, Profile};

#[test]
fn profile_document_tests_decodes_tagged_settings() {
    let raw = br#"{
        "profile_name": "idsec",
        "profile_description": "default profile",
        "auth_profiles": {
            "isp": {
                "username": "alice@tenant",
                "settings": {
                    "method": "interactive",
                    "settings": { "identity_tenant_subdomain": "tenant", "identity_mfa_method": "pf" }
                }
            }
        }
    }"#;

    let profile = Profile::from_json_bytes(raw).expect("profile should decode");
    let auth_profile = profile.auth_profile("isp").expect("isp profile should exist");
    assert_eq!(auth_profile.auth_method(), AuthMethod::Interactive);

    let AuthMethodSettings::Interactive(settings) = &auth_profile.settings else {
        panic!("expected interactive settings");
    };
    assert_eq!(settings.identity_tenant_subdomain.as_deref(), Some("tenant"));
    assert_eq!(settings.identity_mfa_method.as_deref(), Some("pf"));
    assert!(settings.identity_mfa_interactive);
}

#[test]
fn profile_document_tests_replaces_auth_profile_per_authenticator() {
    let first = AuthProfile::new(
        "alice",
        AuthMethodSettings::Interactive(InteractiveSettings::default()),
    );
    let second = AuthProfile::new("bob", AuthMethodSettings::Default);

    let profile = Profile::new("idsec")
        .with_auth_profile("isp", first)
        .with_auth_profile("isp", second.clone());

    assert_eq!(profile.auth_profiles.len(), 1);
    assert_eq!(profile.auth_profile("isp"), Some(&second));

    let encoded = profile.to_json_bytes().expect("encoding should succeed");
    assert_eq!(
        Profile::from_json_bytes(&encoded).expect("decoding should succeed"),
        profile
    );
}
