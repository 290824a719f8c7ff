use std::fs;

use serial_test::serial;
use sluice_config::loader::{ENV_DELUGE_HOST, ENV_LOG_LEVEL};
use sluice_config::{ConfigError, load_from_path};
use tempfile::TempDir;

const DOCUMENT: &str = r"
deluge:
  host: 192.168.1.10
  username: localclient
  password: secret
  download_alt_speed: 100
  upload_alt_speed: 50
host:
  scan_interval_secs: 15
logging:
  level: debug
  format: json
";

struct EnvGuard(&'static str);

impl EnvGuard {
    fn set(key: &'static str, value: &str) -> Self {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var(key, value) };
        Self(key)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::remove_var(self.0) };
    }
}

#[test]
#[serial]
fn loads_document_from_disk() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sluice.yaml");
    fs::write(&path, DOCUMENT)?;

    let config = load_from_path(&path)?;
    assert_eq!(config.deluge.address(), "192.168.1.10:58846");
    assert!((config.deluge.download_alt_speed - 100.0).abs() < f64::EPSILON);
    assert_eq!(config.host.scan_interval_secs, 15);
    assert_eq!(config.host.setup_retry_secs, 30);
    assert_eq!(config.logging.level, "debug");
    Ok(())
}

#[test]
#[serial]
fn environment_overrides_take_precedence() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sluice.yaml");
    fs::write(&path, DOCUMENT)?;

    let _host = EnvGuard::set(ENV_DELUGE_HOST, "deluge.lan");
    let _level = EnvGuard::set(ENV_LOG_LEVEL, "trace");
    let config = load_from_path(&path)?;
    assert_eq!(config.deluge.host, "deluge.lan");
    assert_eq!(config.logging.level, "trace");
    Ok(())
}

#[test]
#[serial]
fn missing_file_is_an_io_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let err = load_from_path(&dir.path().join("absent.yaml")).expect_err("file is absent");
    assert!(matches!(err, ConfigError::Io { operation: "read_config", .. }));
    Ok(())
}

#[test]
#[serial]
fn malformed_yaml_is_a_parse_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sluice.yaml");
    fs::write(&path, "deluge: [unterminated")?;
    let err = load_from_path(&path).expect_err("yaml is malformed");
    assert!(matches!(err, ConfigError::Parse { path: Some(_), .. }));
    Ok(())
}
