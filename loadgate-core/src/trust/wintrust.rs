//! WinVerifyTrust binding
//!
//! A verify call leaves state behind in `hWVTStateData` that must be freed
//! by a second call with `WTD_STATEACTION_CLOSE`. [`VerificationState`] owns
//! that second call, so it runs on every return path.

use crate::trust::outcome::{
    SignatureOutcome, TRUST_E_NOSIGNATURE, TRUST_E_PROVIDER_UNKNOWN, TRUST_E_SUBJECT_FORM_UNKNOWN,
};
use std::ffi::c_void;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::{mem, ptr};
use tracing::{debug, warn};
use windows_sys::core::GUID;
use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::Security::WinTrust::{
    WinVerifyTrust, WINTRUST_ACTION_GENERIC_VERIFY_V2, WINTRUST_DATA, WINTRUST_FILE_INFO,
    WTD_CHOICE_FILE, WTD_REVOKE_NONE, WTD_STATEACTION_CLOSE, WTD_STATEACTION_VERIFY, WTD_UI_NONE,
};

pub(crate) fn verify_file(path: &Path) -> SignatureOutcome {
    let wide_path: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    // SAFETY: both structs are plain C data for which all-zero is the
    // documented "unset" state.
    let mut file_info: WINTRUST_FILE_INFO = unsafe { mem::zeroed() };
    file_info.cbStruct = mem::size_of::<WINTRUST_FILE_INFO>() as u32;
    file_info.pcwszFilePath = wide_path.as_ptr();

    let mut data: WINTRUST_DATA = unsafe { mem::zeroed() };
    data.cbStruct = mem::size_of::<WINTRUST_DATA>() as u32;
    data.dwUIChoice = WTD_UI_NONE;
    data.fdwRevocationChecks = WTD_REVOKE_NONE;
    data.dwUnionChoice = WTD_CHOICE_FILE;
    data.dwStateAction = WTD_STATEACTION_VERIFY;
    data.Anonymous.pFile = &mut file_info;

    let mut policy = WINTRUST_ACTION_GENERIC_VERIFY_V2;
    let state = VerificationState::acquire(&mut policy, &mut data);

    if state.status == TRUST_E_NOSIGNATURE {
        match state.last_error {
            TRUST_E_NOSIGNATURE | TRUST_E_SUBJECT_FORM_UNKNOWN | TRUST_E_PROVIDER_UNKNOWN => {
                debug!("{} is not signed", path.display());
            }
            other => {
                debug!(
                    "{} has an invalid signature or could not be opened (0x{:08X})",
                    path.display(),
                    other as u32
                );
            }
        }
    }

    SignatureOutcome::from_status(state.status)
}

/// Verification state acquired from the trust service, released on drop
struct VerificationState<'a> {
    policy: &'a mut GUID,
    data: &'a mut WINTRUST_DATA,
    status: i32,
    last_error: i32,
}

impl<'a> VerificationState<'a> {
    fn acquire(policy: &'a mut GUID, data: &'a mut WINTRUST_DATA) -> Self {
        // SAFETY: `policy` and `data` outlive the state, and `data.pFile`
        // points at file info whose path buffer outlives both calls.
        let status = unsafe {
            WinVerifyTrust(
                ptr::null_mut(),
                &mut *policy,
                (&mut *data as *mut WINTRUST_DATA).cast::<c_void>(),
            )
        };
        // Read before anything else can overwrite the thread's last error
        let last_error = unsafe { GetLastError() } as i32;

        VerificationState {
            policy,
            data,
            status,
            last_error,
        }
    }
}

impl Drop for VerificationState<'_> {
    fn drop(&mut self) {
        self.data.dwStateAction = WTD_STATEACTION_CLOSE;
        // SAFETY: same structures as the verify call, now asking for release
        let status = unsafe {
            WinVerifyTrust(
                ptr::null_mut(),
                &mut *self.policy,
                (&mut *self.data as *mut WINTRUST_DATA).cast::<c_void>(),
            )
        };
        if status != 0 {
            warn!("Failed to release trust verification state (0x{:08X})", status as u32);
        }
    }
}
