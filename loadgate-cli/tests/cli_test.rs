//! Integration tests for the `loadgate` binary

use anyhow::Result;
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

const ROOT_VARS: [&str; 4] = ["SystemRoot", "ProgramFiles", "ProgramW6432", "ProgramFiles(x86)"];

/// Run loadgate with the root variables replaced by `vars`
fn run_loadgate(args: &[&str], vars: &[(&str, &str)]) -> Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_loadgate"));
    command.args(args).env("RUST_LOG", "off");
    for key in ROOT_VARS {
        command.env_remove(key);
    }
    for (key, value) in vars {
        command.env(key, value);
    }
    Ok(command.output()?)
}

#[test]
fn test_roots_json_lists_all_four() -> Result<()> {
    let output = run_loadgate(
        &["roots", "--json"],
        &[
            ("SystemRoot", r"C:\Windows"),
            ("ProgramFiles", r"C:\Program Files"),
        ],
    )?;
    assert!(output.status.success());

    let roots: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let roots = roots.as_array().unwrap();
    assert_eq!(roots.len(), 4);
    assert_eq!(roots[0]["label"], "system_dir");
    assert_eq!(roots[0]["absolute_path"], r"C:\Windows\System32");
    assert_eq!(roots[1]["absolute_path"], r"C:\Windows\SysWOW64");
    assert_eq!(
        roots[2]["absolute_path"],
        r"C:\Program Files\Razer Chroma SDK\bin"
    );
    assert!(roots[3]["absolute_path"].is_null());
    Ok(())
}

#[test]
fn test_roots_config_file_and_product_dir() -> Result<()> {
    let dir = TempDir::new()?;
    let config = dir.path().join("loadgate.yml");
    fs::write(&config, "program_files_x86_root: 'D:\\Apps'\n")?;

    let output = run_loadgate(
        &[
            "roots",
            "--json",
            "--config",
            config.to_str().unwrap(),
            "--product-dir",
            "Acme SDK",
        ],
        &[],
    )?;
    assert!(output.status.success());

    let roots: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(roots[3]["absolute_path"], r"D:\Apps\Acme SDK\bin");
    assert!(roots[0]["absolute_path"].is_null());
    Ok(())
}

// Without a platform trust service every file is indeterminate.
#[cfg(not(windows))]
#[test]
fn test_verify_fails_closed_off_windows() -> Result<()> {
    let dir = TempDir::new()?;
    let module = dir.path().join("foo.dll");
    fs::write(&module, b"MZ")?;

    let output = run_loadgate(&["verify", module.to_str().unwrap(), "--json"], &[])?;
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["verdict"], "indeterminate_error");
    assert_eq!(report["module"]["expected_name"], "foo.dll");
    assert!(report["matched_root"].is_null());
    Ok(())
}

#[test]
fn test_verify_rejects_bad_name() -> Result<()> {
    let dir = TempDir::new()?;
    let module = dir.path().join("foo.dll");
    fs::write(&module, b"MZ")?;

    let output = run_loadgate(
        &["verify", module.to_str().unwrap(), "--name", r"..\foo.dll"],
        &[],
    )?;

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid module name"));
    Ok(())
}
