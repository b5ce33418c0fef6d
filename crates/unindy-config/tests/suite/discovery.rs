use std::ffi::OsString;
use std::sync::Mutex;

use unindy_config::{
    discover_config_path, load_for_invocation, CompressionSetting, UNINDY_CONFIG_ENV_VAR,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &std::path::Path) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn no_file_means_defaults() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let _env = EnvVarGuard::unset(UNINDY_CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();

    assert_eq!(discover_config_path(dir.path()), None);
    let (config, path) = load_for_invocation(dir.path()).unwrap();
    assert_eq!(path, None);
    assert_eq!(config.archive.compression, CompressionSetting::Deflated);
}

#[test]
fn working_directory_file_is_found() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let _env = EnvVarGuard::unset(UNINDY_CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("unindy.toml");
    std::fs::write(&file, "[archive]\ncompression = \"stored\"\n").unwrap();

    let (config, path) = load_for_invocation(dir.path()).unwrap();
    assert_eq!(path, Some(file));
    assert_eq!(config.archive.compression, CompressionSetting::Stored);
}

#[test]
fn env_var_overrides_working_directory_file() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("unindy.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();
    let custom = dir.path().join("custom.toml");
    std::fs::write(&custom, "[logging]\nlevel = \"trace\"\n").unwrap();
    let _env = EnvVarGuard::set(UNINDY_CONFIG_ENV_VAR, std::path::Path::new("custom.toml"));

    let (config, path) = load_for_invocation(dir.path()).unwrap();
    assert_eq!(path, Some(custom));
    assert_eq!(config.logging.level, "trace");
}

#[test]
fn env_var_pointing_nowhere_is_an_error() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let _env = EnvVarGuard::set(UNINDY_CONFIG_ENV_VAR, &dir.path().join("nope.toml"));

    assert!(load_for_invocation(dir.path()).is_err());
}
