use fcrypt_kernel::config::{ConfigError, load_config};
use fcrypt_kernel::domain::config::FieldCryptConfig;
use fcrypt_kernel::domain::mode::EncryptionMode;
use fcrypt_kernel::mode::resolve_mode;
use std::io::Write;

fn write_config(extension: &str, body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(extension).tempfile().expect("temp file");
    file.write_all(body.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_toml_with_local_keys() {
    let file = write_config(
        ".toml",
        &format!(
            r#"
            [encryption]
            stage = "prod"

            [encryption.local.active]
            id = "2024-06"
            key = "{}"

            [[encryption.local.deprecated]]
            id = "2023-01"
            key = "{}"

            [logging]
            level = "debug"
            "#,
            "ab".repeat(32),
            "cd".repeat(32)
        ),
    );

    let cfg: FieldCryptConfig = load_config(Some(file.path())).expect("config loads");
    let local = cfg.encryption.local_keys().expect("local keys");
    assert_eq!(local.active.id, "2024-06");
    assert_eq!(local.deprecated[0].id, "2023-01");
    assert!(local.wrap_data_keys);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(resolve_mode(&cfg.encryption).unwrap(), EncryptionMode::Local);
}

#[test]
fn loads_json_with_remote_key_and_bypass_list() {
    let file = write_config(
        ".json",
        r#"{
            "encryption": {
                "stage": "dev",
                "bypass_stages": ["dev"],
                "remote": { "master_key_id": "arn:aws:kms:eu-west-1:1:key/abc" }
            }
        }"#,
    );

    let cfg: FieldCryptConfig = load_config(Some(file.path())).expect("config loads");
    assert_eq!(cfg.encryption.remote_key().unwrap().master_key_id, "arn:aws:kms:eu-west-1:1:key/abc");
    assert_eq!(
        resolve_mode(&cfg.encryption).unwrap(),
        EncryptionMode::Bypass { stage: "dev".to_owned() }
    );
}

#[test]
fn conflicting_file_fails_at_startup() {
    let file = write_config(
        ".toml",
        &format!(
            r#"
            [encryption.local.active]
            id = "k1"
            key = "{}"

            [encryption.remote]
            master_key_id = "arn:aws:kms:eu-west-1:1:key/abc"
            "#,
            "ab".repeat(32)
        ),
    );

    let cfg: FieldCryptConfig = load_config(Some(file.path())).expect("config loads");
    let err = resolve_mode(&cfg.encryption).unwrap_err();
    assert!(matches!(err, ConfigError::Conflict { .. }));
    assert_eq!(err.to_string(), "Local and remote encryption keys are both configured");
}

#[test]
fn missing_file_is_an_error() {
    let result = load_config::<FieldCryptConfig>(Some("/definitely/not/here/fcrypt.toml"));
    assert!(matches!(result, Err(ConfigError::Config { .. })));
}
