//! Signature outcomes and final verdicts
//!
//! Status codes are kept as plain `i32` constants so the mapping from the
//! platform trust service can be exercised on any host.

use serde::Serialize;
use std::fmt;

/// `ERROR_SUCCESS`
pub const STATUS_SUCCESS: i32 = 0;
/// No signature was present in the subject
pub const TRUST_E_NOSIGNATURE: i32 = 0x800B_0100_u32 as i32;
/// The form specified for the subject is not one supported or known
pub const TRUST_E_SUBJECT_FORM_UNKNOWN: i32 = 0x800B_0003_u32 as i32;
/// Unknown trust provider
pub const TRUST_E_PROVIDER_UNKNOWN: i32 = 0x800B_0001_u32 as i32;
/// The certificate was explicitly marked as untrusted
pub const TRUST_E_EXPLICIT_DISTRUST: i32 = 0x800B_0111_u32 as i32;
/// The subject is not trusted for the specified action
pub const TRUST_E_SUBJECT_NOT_TRUSTED: i32 = 0x800B_0004_u32 as i32;
/// The operation was blocked by local security settings
pub const CRYPT_E_SECURITY_SETTINGS: i32 = 0x8009_2026_u32 as i32;
/// Reported when no trust service exists on the host
pub const E_NOTIMPL: i32 = 0x8000_4001_u32 as i32;

/// Result of asking the platform trust service about a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignatureOutcome {
    /// Signature chains to a trusted root under the code-signing policy
    Valid,
    /// No signature, or a signature the service could not recognise
    NoSignature,
    /// Subject or publisher is explicitly distrusted by admin or user
    ExplicitlyDistrusted,
    /// Subject not trusted for the action (user declined)
    UserRejected,
    /// Admin policy disallows trusting the subject
    SecurityPolicyBlocked,
    /// Any other status, usually a publisher or timestamp chain error
    OtherError { status: i32 },
}

impl SignatureOutcome {
    /// Map a raw status returned by the trust service
    pub fn from_status(status: i32) -> Self {
        match status {
            STATUS_SUCCESS => SignatureOutcome::Valid,
            TRUST_E_NOSIGNATURE | TRUST_E_SUBJECT_FORM_UNKNOWN | TRUST_E_PROVIDER_UNKNOWN => {
                SignatureOutcome::NoSignature
            }
            TRUST_E_EXPLICIT_DISTRUST => SignatureOutcome::ExplicitlyDistrusted,
            TRUST_E_SUBJECT_NOT_TRUSTED => SignatureOutcome::UserRejected,
            CRYPT_E_SECURITY_SETTINGS => SignatureOutcome::SecurityPolicyBlocked,
            other => SignatureOutcome::OtherError { status: other },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SignatureOutcome::Valid)
    }

    /// Verdict for an outcome that stops the gate before the path check.
    ///
    /// Returns `None` for `Valid`, which must go on to the path check.
    pub fn rejection(&self) -> Option<TrustVerdict> {
        match self {
            SignatureOutcome::Valid => None,
            SignatureOutcome::NoSignature => Some(TrustVerdict::Unsigned),
            SignatureOutcome::ExplicitlyDistrusted
            | SignatureOutcome::UserRejected
            | SignatureOutcome::SecurityPolicyBlocked => Some(TrustVerdict::Untrusted),
            SignatureOutcome::OtherError { .. } => Some(TrustVerdict::IndeterminateError),
        }
    }
}

impl fmt::Display for SignatureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureOutcome::Valid => write!(f, "valid signature"),
            SignatureOutcome::NoSignature => write!(f, "no signature"),
            SignatureOutcome::ExplicitlyDistrusted => write!(f, "explicitly distrusted"),
            SignatureOutcome::UserRejected => write!(f, "subject not trusted"),
            SignatureOutcome::SecurityPolicyBlocked => write!(f, "blocked by security settings"),
            SignatureOutcome::OtherError { status } => {
                write!(f, "verification error 0x{:08X}", *status as u32)
            }
        }
    }
}

/// Final decision for one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustVerdict {
    Trusted,
    Unsigned,
    Untrusted,
    IndeterminateError,
}

impl TrustVerdict {
    /// Collapse to the binary answer handed to the host
    pub fn is_trusted(&self) -> bool {
        matches!(self, TrustVerdict::Trusted)
    }
}

impl fmt::Display for TrustVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrustVerdict::Trusted => "trusted",
            TrustVerdict::Unsigned => "unsigned",
            TrustVerdict::Untrusted => "untrusted",
            TrustVerdict::IndeterminateError => "indeterminate",
        };
        f.write_str(s)
    }
}
