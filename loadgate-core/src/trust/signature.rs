//! Signature verification against the platform trust service

use crate::trust::outcome::SignatureOutcome;
use std::path::Path;
use tracing::debug;

/// Checks the embedded signature of a file on disk
pub trait SignatureVerifier {
    fn verify(&self, path: &Path) -> SignatureOutcome;
}

/// Authenticode verification under the generic code-signing policy.
///
/// Runs without UI, without online revocation checks, against the file
/// itself (not a catalog). Hosts without a trust service always get
/// `OtherError`, so the gate fails closed there.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticodeVerifier;

impl SignatureVerifier for AuthenticodeVerifier {
    fn verify(&self, path: &Path) -> SignatureOutcome {
        debug!("Verifying Authenticode signature: {}", path.display());
        let outcome = platform::verify_file(path);
        debug!("Signature check for {}: {}", path.display(), outcome);
        outcome
    }
}

#[cfg(windows)]
use crate::trust::wintrust as platform;

#[cfg(not(windows))]
mod platform {
    use crate::trust::outcome::{SignatureOutcome, E_NOTIMPL};
    use std::path::Path;
    use tracing::warn;

    pub(super) fn verify_file(path: &Path) -> SignatureOutcome {
        warn!(
            "No platform trust service on this host; {} cannot be verified",
            path.display()
        );
        SignatureOutcome::OtherError { status: E_NOTIMPL }
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::trust::outcome::E_NOTIMPL;

    #[test]
    fn test_fails_closed_without_trust_service() {
        let outcome = AuthenticodeVerifier.verify(Path::new("/usr/lib/libfoo.so"));
        assert_eq!(outcome, SignatureOutcome::OtherError { status: E_NOTIMPL });
        assert!(!outcome.is_valid());
    }
}
