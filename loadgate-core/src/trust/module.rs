//! Module identity and path resolution
//!
//! The gate resolves a module's on-disk path exactly once per check and
//! works from that snapshot, so the file cannot be swapped between the
//! signature check and the path check.

use crate::trust::error::TrustError;
use serde::Serialize;
use std::path::PathBuf;

/// A module under inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleIdentity {
    /// File name the host expects, e.g. `RzChromaSDK64.dll`
    pub expected_name: String,

    /// Absolute path the module was actually loaded from
    pub resolved_path: PathBuf,
}

impl ModuleIdentity {
    pub fn new(expected_name: impl Into<String>, resolved_path: impl Into<PathBuf>) -> Self {
        ModuleIdentity {
            expected_name: expected_name.into(),
            resolved_path: resolved_path.into(),
        }
    }

    /// Resolve a handle through `resolver` and pair it with the expected name
    pub fn resolve<R: ModuleResolver>(
        resolver: &R,
        handle: &R::Handle,
        expected_name: &str,
    ) -> Result<Self, TrustError> {
        validate_name(expected_name)?;
        let resolved_path = resolver.resolve_path(handle)?;
        Ok(ModuleIdentity::new(expected_name, resolved_path))
    }
}

/// Expected names are appended to root paths, so they must be bare file names
pub fn validate_name(name: &str) -> Result<(), TrustError> {
    if name.is_empty() || name.contains(['\\', '/']) {
        return Err(TrustError::InvalidModuleName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Turns a host-specific module handle into its absolute file path
pub trait ModuleResolver {
    type Handle;

    fn resolve_path(&self, handle: &Self::Handle) -> Result<PathBuf, TrustError>;
}

/// Resolver for modules identified directly by their path on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePathResolver;

impl ModuleResolver for FilePathResolver {
    type Handle = PathBuf;

    fn resolve_path(&self, handle: &PathBuf) -> Result<PathBuf, TrustError> {
        if handle.as_os_str().is_empty() {
            return Err(TrustError::unresolved("empty module path"));
        }
        if !handle.is_absolute() {
            return Err(TrustError::unresolved(format!(
                "module path is not absolute: {}",
                handle.display()
            )));
        }
        Ok(handle.clone())
    }
}

/// Whether a module name of `len` wide chars copied into a `capacity`
/// buffer is complete.
///
/// `GetModuleFileNameExW` truncates to `capacity` chars including the NUL
/// and then reports `capacity - 1`, so a result that long may be cut short.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn fits_without_truncation(len: usize, capacity: usize) -> bool {
    len + 1 < capacity
}

#[cfg(windows)]
pub use loaded::{LoadedModuleResolver, ModuleHandle};

#[cfg(windows)]
mod loaded {
    use super::{fits_without_truncation, ModuleResolver};
    use crate::trust::error::TrustError;
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use std::path::PathBuf;
    use tracing::trace;
    use windows_sys::Win32::Foundation::{GetLastError, HMODULE, MAX_PATH};
    use windows_sys::Win32::System::ProcessStatus::GetModuleFileNameExW;
    use windows_sys::Win32::System::Threading::GetCurrentProcess;

    /// Longest path the wide-character APIs accept
    const MAX_LONG_PATH: usize = 32_768;

    /// Handle of a module loaded into the current process
    #[derive(Debug, Clone, Copy)]
    pub struct ModuleHandle(pub HMODULE);

    /// Resolves modules loaded into the current process
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LoadedModuleResolver;

    impl ModuleResolver for LoadedModuleResolver {
        type Handle = ModuleHandle;

        fn resolve_path(&self, handle: &ModuleHandle) -> Result<PathBuf, TrustError> {
            let mut capacity = MAX_PATH as usize;

            loop {
                let mut buffer = vec![0u16; capacity];
                // SAFETY: the buffer is valid for `capacity` wide chars and the
                // pseudo-handle from GetCurrentProcess needs no closing.
                let len = unsafe {
                    GetModuleFileNameExW(
                        GetCurrentProcess(),
                        handle.0,
                        buffer.as_mut_ptr(),
                        capacity as u32,
                    )
                } as usize;

                if len == 0 {
                    let code = unsafe { GetLastError() };
                    return Err(TrustError::unresolved(format!(
                        "GetModuleFileNameExW failed (error {code})"
                    )));
                }

                if fits_without_truncation(len, capacity) {
                    buffer.truncate(len);
                    let path = PathBuf::from(OsString::from_wide(&buffer));
                    trace!("Resolved module handle to {}", path.display());
                    return Ok(path);
                }

                if capacity >= MAX_LONG_PATH {
                    return Err(TrustError::unresolved(
                        "module path exceeds the longest supported path",
                    ));
                }
                capacity = (capacity * 2).min(MAX_LONG_PATH);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("RzChromaSDK64.dll").is_ok());
        assert!(matches!(
            validate_name(""),
            Err(TrustError::InvalidModuleName { .. })
        ));
        assert!(validate_name(r"..\evil.dll").is_err());
        assert!(validate_name("bin/evil.dll").is_err());
    }

    #[test]
    fn test_truncated_name_is_not_accepted() {
        // 300-char path into a MAX_PATH buffer comes back as 259 chars
        assert!(!fits_without_truncation(259, 260));
        assert!(!fits_without_truncation(260, 260));
        assert!(fits_without_truncation(258, 260));
        assert!(fits_without_truncation(40, 260));
    }

    #[test]
    fn test_file_resolver_rejects_relative() {
        let result = FilePathResolver.resolve_path(&PathBuf::from("foo.dll"));
        assert!(matches!(
            result,
            Err(TrustError::ModulePathUnresolved { .. })
        ));
    }

    #[test]
    fn test_file_resolver_rejects_empty() {
        let result = FilePathResolver.resolve_path(&PathBuf::new());
        assert!(matches!(
            result,
            Err(TrustError::ModulePathUnresolved { .. })
        ));
    }

    #[test]
    fn test_resolve_checks_name_first() {
        let result = ModuleIdentity::resolve(&FilePathResolver, &PathBuf::new(), "");
        assert!(matches!(result, Err(TrustError::InvalidModuleName { .. })));
    }
}
