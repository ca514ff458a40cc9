//! Loading bridge configuration from disk

use std::io::Write;

use bridgekit::{BridgeConfig, BridgeContext, BridgeError, FaultFormat};

#[test]
fn load_reads_a_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"fault": {{"sentinel": "__FLASHERROR"}}, "max_local_functions": 8}}"#
    )
    .unwrap();

    let config = BridgeConfig::load(file.path()).unwrap();

    assert_eq!(config.fault, FaultFormat::legacy());
    assert_eq!(config.local_function_limit(), 8);

    let context = BridgeContext::with_config(config);
    assert_eq!(context.config().fault.sentinel, "__FLASHERROR");
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BridgeConfig::load(&dir.path().join("absent.json")).unwrap_err();

    assert!(matches!(err, BridgeError::Config(ref message) if message.contains("absent.json")));
}

#[test]
fn invalid_json_is_a_config_error() {
    let err = BridgeConfig::from_json("{\"max_local_functions\": \"lots\"}").unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)));
}
