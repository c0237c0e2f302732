use assert_matches::assert_matches;

use metabolights_mirror::config::{ConfigLoader, ConfigOverrides, DEFAULT_REMOTE_DIR};
use metabolights_mirror::domain::Transport;
use metabolights_mirror::error::MirrorError;

#[test]
fn loads_json_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("mtbls-mirror.json");
    std::fs::write(
        &path,
        r#"{ "schema_version": 1, "transport": "https", "data_dir": "study-data" }"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap();
    assert_eq!(resolved.remote.transport, Transport::Https);
    assert_eq!(resolved.remote.host, "ftp.ebi.ac.uk");
    assert_eq!(resolved.remote.remote_dir, DEFAULT_REMOTE_DIR);
    assert_eq!(resolved.data_dir.as_str(), "study-data");
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, MirrorError::MissingConfig(_));
}

#[test]
fn malformed_config_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("mtbls-mirror.json");
    std::fs::write(&path, r#"{ "transport": "gopher" }"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, MirrorError::ConfigParse(_));
}
