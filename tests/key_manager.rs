//! KeyManager integration tests: layered sources, file formats, and the
//! precedence invariant (file > env > keyring).

use std::io::Write;

use agentvault::{KeyManager, KeySource};
use serial_test::serial;

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn env_file_keys_are_loaded_and_case_folded() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "keys.env", "OPENAI=sk-123\nMyService=abc\n");

    let keys = KeyManager::builder()
        .key_file(&path)
        .env_vars(false)
        .build();

    assert_eq!(keys.get_key("openai").as_deref(), Some("sk-123"));
    assert_eq!(keys.get_key("OPENAI").as_deref(), Some("sk-123"));
    assert_eq!(keys.get_key("myservice").as_deref(), Some("abc"));
    assert_eq!(keys.get_key_source("openai"), Some(KeySource::File));
}

#[test]
fn empty_file_values_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "keys.env", "FULL=value\nEMPTY=\n");

    let keys = KeyManager::builder()
        .key_file(&path)
        .env_vars(false)
        .build();

    assert_eq!(keys.get_key("full").as_deref(), Some("value"));
    assert!(keys.get_key("empty").is_none());
    assert!(keys.get_key_source("empty").is_none());
}

#[test]
fn json_file_keys_are_loaded_and_non_strings_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "keys.json",
        r#"{"Svc": "secret", "Number": 42, "Empty": "", "Nested": {"x": 1}}"#,
    );

    let keys = KeyManager::builder()
        .key_file(&path)
        .env_vars(false)
        .build();

    assert_eq!(keys.get_key("svc").as_deref(), Some("secret"));
    assert!(keys.get_key("number").is_none());
    assert!(keys.get_key("empty").is_none());
    assert!(keys.get_key("nested").is_none());
}

#[test]
fn json_root_must_be_object() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "keys.json", r#"["not", "an", "object"]"#);

    let keys = KeyManager::builder()
        .key_file(&path)
        .env_vars(false)
        .build();
    assert!(keys.get_key("not").is_none());
}

#[test]
fn unknown_file_extension_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "keys.yaml", "svc: secret\n");

    let keys = KeyManager::builder()
        .key_file(&path)
        .env_vars(false)
        .build();
    assert!(keys.get_key("svc").is_none());
}

#[test]
fn missing_file_is_non_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let keys = KeyManager::builder()
        .key_file(dir.path().join("missing.env"))
        .env_vars(false)
        .build();
    assert!(keys.get_key("anything").is_none());
}

#[test]
fn malformed_json_is_non_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "keys.json", "{not valid json");

    let keys = KeyManager::builder()
        .key_file(&path)
        .env_vars(false)
        .build();
    assert!(keys.get_key("svc").is_none());
}

#[test]
#[serial]
fn env_vars_are_loaded_with_prefix() {
    std::env::set_var("AGENTVAULT_KEY_ENVSVC", "env-secret");
    std::env::set_var("AGENTVAULT_KEY_BLANK", "");

    let keys = KeyManager::new();
    assert_eq!(keys.get_key("envsvc").as_deref(), Some("env-secret"));
    assert_eq!(keys.get_key_source("envsvc"), Some(KeySource::Env));
    // Empty-value variables are skipped.
    assert!(keys.get_key("blank").is_none());

    std::env::remove_var("AGENTVAULT_KEY_ENVSVC");
    std::env::remove_var("AGENTVAULT_KEY_BLANK");
}

#[test]
#[serial]
fn file_keys_take_precedence_over_env() {
    std::env::set_var("AGENTVAULT_KEY_SHARED", "from-env");
    std::env::set_var("AGENTVAULT_KEY_ENVONLY", "env-only");

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "keys.env", "SHARED=from-file\n");

    let keys = KeyManager::builder().key_file(&path).build();

    // Same service id in both sources: the file wins and the binding sticks.
    assert_eq!(keys.get_key("shared").as_deref(), Some("from-file"));
    assert_eq!(keys.get_key_source("shared"), Some(KeySource::File));
    // Ids only present in the environment still resolve.
    assert_eq!(keys.get_key("envonly").as_deref(), Some("env-only"));
    assert_eq!(keys.get_key_source("envonly"), Some(KeySource::Env));

    std::env::remove_var("AGENTVAULT_KEY_SHARED");
    std::env::remove_var("AGENTVAULT_KEY_ENVONLY");
}

#[test]
#[serial]
fn custom_env_prefix_is_respected() {
    std::env::set_var("MYAPP_KEY_SVC", "custom-secret");
    std::env::set_var("AGENTVAULT_KEY_SVC", "default-secret");

    let keys = KeyManager::builder().env_prefix("MYAPP_KEY_").build();
    assert_eq!(keys.get_key("svc").as_deref(), Some("custom-secret"));

    std::env::remove_var("MYAPP_KEY_SVC");
    std::env::remove_var("AGENTVAULT_KEY_SVC");
}

#[test]
#[serial]
fn oauth_credentials_resolve_independently_per_source() {
    // Client id from the environment, client secret and API key from the
    // file: each binds its own source.
    std::env::set_var("AGENTVAULT_OAUTH_CLIENT_ID_MIXED", "id-from-env");

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "keys.env",
        "MIXED=api-key-from-file\nMIXED_OAUTH_CLIENT_SECRET=secret-from-file\n",
    );

    let keys = KeyManager::builder().key_file(&path).build();

    assert_eq!(keys.get_key("mixed").as_deref(), Some("api-key-from-file"));
    assert_eq!(
        keys.get_oauth_client_id("mixed").as_deref(),
        Some("id-from-env")
    );
    assert_eq!(
        keys.get_oauth_client_secret("mixed").as_deref(),
        Some("secret-from-file")
    );

    std::env::remove_var("AGENTVAULT_OAUTH_CLIENT_ID_MIXED");
}

#[test]
fn oauth_file_entries_do_not_shadow_api_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "keys.env",
        "SVC_OAUTH_CLIENT_ID=the-id\nSVC_OAUTH_CLIENT_SECRET=the-secret\n",
    );

    let keys = KeyManager::builder()
        .key_file(&path)
        .env_vars(false)
        .build();

    // The OAuth entries land in their own maps, not the API key map.
    assert!(keys.get_key("svc").is_none());
    assert!(keys.get_key("svc_oauth_client_id").is_none());
    assert_eq!(keys.get_oauth_client_id("svc").as_deref(), Some("the-id"));
    assert_eq!(
        keys.get_oauth_client_secret("svc").as_deref(),
        Some("the-secret")
    );
}

#[test]
fn keyring_disabled_write_fails_with_credential_error() {
    let keys = KeyManager::builder().env_vars(false).build();
    let err = keys.set_key_in_keyring("svc", "secret").unwrap_err();
    assert!(matches!(err, agentvault::A2AError::Credential(_)));
}
