//! Sanctioned install roots
//!
//! Four directories are considered safe locations for the SDK module:
//!
//! - `%SystemRoot%\System32`
//! - `%SystemRoot%\SysWOW64`
//! - `%ProgramW6432%\<product>\bin` (falls back to `%ProgramFiles%`)
//! - `%ProgramFiles(x86)%\<product>\bin`
//!
//! Roots are derived fresh for every check. An unset or empty variable
//! makes the corresponding root absent, and absent roots never match.

use crate::trust::error::TrustError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Product directory under Program Files
pub const DEFAULT_PRODUCT_DIR: &str = "Razer Chroma SDK";

/// Separator used when building root paths
pub const PATH_SEPARATOR: char = '\\';

pub const ENV_SYSTEM_ROOT: &str = "SystemRoot";
pub const ENV_PROGRAM_FILES: &str = "ProgramFiles";
pub const ENV_PROGRAM_W6432: &str = "ProgramW6432";
pub const ENV_PROGRAM_FILES_X86: &str = "ProgramFiles(x86)";

/// Which sanctioned directory a root stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootLabel {
    SystemDir,
    SystemDir32,
    ProgramFilesSdkBin,
    ProgramFilesX86SdkBin,
}

impl fmt::Display for RootLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RootLabel::SystemDir => "system",
            RootLabel::SystemDir32 => "system (32-bit)",
            RootLabel::ProgramFilesSdkBin => "program files sdk",
            RootLabel::ProgramFilesX86SdkBin => "program files (x86) sdk",
        };
        f.write_str(s)
    }
}

/// One sanctioned directory, absent when its variable was unset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanctionedRoot {
    pub label: RootLabel,
    pub absolute_path: Option<String>,
}

impl SanctionedRoot {
    pub fn is_present(&self) -> bool {
        self.absolute_path.is_some()
    }
}

/// Environment-provided roots the sanctioned directories are built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// `%SystemRoot%`, e.g. `C:\Windows`
    pub system_root: Option<String>,

    /// 64-bit Program Files directory
    pub program_files_root: Option<String>,

    /// 32-bit Program Files directory
    pub program_files_x86_root: Option<String>,

    /// SDK directory name under Program Files
    pub product_dir: String,
}

impl Default for RootConfig {
    fn default() -> Self {
        RootConfig {
            system_root: None,
            program_files_root: None,
            program_files_x86_root: None,
            product_dir: DEFAULT_PRODUCT_DIR.to_string(),
        }
    }
}

impl RootConfig {
    /// Read the roots from the current process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Derive the roots from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        RootConfig {
            system_root: get(ENV_SYSTEM_ROOT),
            // A 32-bit process sees the x86 directory under %ProgramFiles%,
            // %ProgramW6432% still names the 64-bit one.
            program_files_root: get(ENV_PROGRAM_W6432).or_else(|| get(ENV_PROGRAM_FILES)),
            program_files_x86_root: get(ENV_PROGRAM_FILES_X86),
            product_dir: DEFAULT_PRODUCT_DIR.to_string(),
        }
    }

    /// Load roots from a YAML file; fields the file leaves out are filled
    /// from the environment
    pub fn load(path: &Path) -> Result<Self, TrustError> {
        let content = std::fs::read_to_string(path).map_err(|source| TrustError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: RootConfig =
            serde_yaml_ng::from_str(&content).map_err(|source| TrustError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Loaded gate configuration from {}", path.display());
        Ok(config.overlay(&RootConfig::from_env()))
    }

    /// Fill unset roots from `fallback`
    pub fn overlay(mut self, fallback: &RootConfig) -> Self {
        if self.system_root.is_none() {
            self.system_root = fallback.system_root.clone();
        }
        if self.program_files_root.is_none() {
            self.program_files_root = fallback.program_files_root.clone();
        }
        if self.program_files_x86_root.is_none() {
            self.program_files_x86_root = fallback.program_files_x86_root.clone();
        }
        self
    }

    pub fn with_product_dir(mut self, product_dir: impl Into<String>) -> Self {
        self.product_dir = product_dir.into();
        self
    }

    /// The four sanctioned directories, in a fixed order
    pub fn sanctioned_roots(&self) -> [SanctionedRoot; 4] {
        let sdk_bin = |root: &Option<String>| {
            present(root).map(|r| join(&[r, self.product_dir.as_str(), "bin"]))
        };

        [
            SanctionedRoot {
                label: RootLabel::SystemDir,
                absolute_path: present(&self.system_root).map(|r| join(&[r, "System32"])),
            },
            SanctionedRoot {
                label: RootLabel::SystemDir32,
                absolute_path: present(&self.system_root).map(|r| join(&[r, "SysWOW64"])),
            },
            SanctionedRoot {
                label: RootLabel::ProgramFilesSdkBin,
                absolute_path: sdk_bin(&self.program_files_root),
            },
            SanctionedRoot {
                label: RootLabel::ProgramFilesX86SdkBin,
                absolute_path: sdk_bin(&self.program_files_x86_root),
            },
        ]
    }
}

// Config files may carry `system_root: ""`, which counts as unset.
fn present(root: &Option<String>) -> Option<&str> {
    root.as_deref().filter(|r| !r.is_empty())
}

fn join(parts: &[&str]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(PATH_SEPARATOR);
        }
        out.push_str(part);
    }
    out
}
