//! Root configuration loading from files and the process environment

use loadgate_core::trust::{RootConfig, TrustError};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const ROOT_VARS: [&str; 4] = ["SystemRoot", "ProgramFiles", "ProgramW6432", "ProgramFiles(x86)"];

/// Run `f` with the root variables set to `vars`, restoring them afterwards
fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let saved: Vec<(&str, Option<String>)> = ROOT_VARS
        .iter()
        .map(|k| (*k, std::env::var(k).ok()))
        .collect();

    for key in ROOT_VARS {
        std::env::remove_var(key);
    }
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    for (key, value) in saved {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    result
}

#[test]
#[serial]
fn test_from_env_reads_fresh_values() {
    let first = with_env(&[("SystemRoot", r"C:\Windows")], RootConfig::from_env);
    let second = with_env(&[("SystemRoot", r"D:\Windows")], RootConfig::from_env);

    assert_eq!(first.system_root.as_deref(), Some(r"C:\Windows"));
    assert_eq!(second.system_root.as_deref(), Some(r"D:\Windows"));
}

#[test]
#[serial]
fn test_load_overlays_environment() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("loadgate.yml");
    fs::write(
        &path,
        "program_files_root: 'E:\\Games'\nproduct_dir: Acme SDK\n",
    )?;

    let config = with_env(&[("SystemRoot", r"C:\Windows")], || RootConfig::load(&path))?;

    assert_eq!(config.system_root.as_deref(), Some(r"C:\Windows"));
    assert_eq!(config.program_files_root.as_deref(), Some(r"E:\Games"));
    assert_eq!(
        config.sanctioned_roots()[2].absolute_path.as_deref(),
        Some(r"E:\Games\Acme SDK\bin")
    );
    Ok(())
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = RootConfig::load(&dir.path().join("absent.yml"));
    assert!(matches!(result, Err(TrustError::ConfigRead { .. })));
}

#[test]
fn test_load_invalid_yaml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yml");
    fs::write(&path, "system_root: [unterminated").unwrap();

    let result = RootConfig::load(&path);
    assert!(matches!(result, Err(TrustError::ConfigParse { .. })));
}
