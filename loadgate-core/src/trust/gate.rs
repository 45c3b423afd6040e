//! The trust gate: signature first, then install location
//!
//! ```text
//! START -> signature
//!   Valid                                   -> path check -> Trusted | Untrusted
//!   NoSignature                             -> Unsigned
//!   ExplicitlyDistrusted / UserRejected
//!     / SecurityPolicyBlocked               -> Untrusted
//!   OtherError                              -> IndeterminateError
//! ```
//!
//! Nothing is retried and nothing is cached between calls.

use crate::trust::allowlist::{PathPolicy, SanctionedPaths};
use crate::trust::error::TrustError;
use crate::trust::module::{ModuleIdentity, ModuleResolver};
use crate::trust::outcome::{SignatureOutcome, TrustVerdict};
use crate::trust::roots::{RootConfig, RootLabel};
use crate::trust::signature::{AuthenticodeVerifier, SignatureVerifier};
use serde::Serialize;
use tracing::{debug, warn};

/// Everything the gate learned about one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustReport {
    pub module: ModuleIdentity,
    pub outcome: SignatureOutcome,
    /// Root the module matched; `None` when the path check failed or never ran
    pub matched_root: Option<RootLabel>,
    pub verdict: TrustVerdict,
}

impl TrustReport {
    pub fn is_trusted(&self) -> bool {
        self.verdict.is_trusted()
    }

    /// Log the verdict, rejections under the `security` target
    pub fn log(&self) {
        let path = self.module.resolved_path.display();
        match (self.verdict, self.matched_root) {
            (TrustVerdict::Trusted, Some(root)) => {
                debug!("Module {} trusted ({} directory)", path, root);
            }
            (TrustVerdict::Untrusted, None) if self.outcome.is_valid() => {
                warn!(
                    target: "security",
                    "MODULE REJECTED: {} is signed but not in a sanctioned directory",
                    path
                );
            }
            (verdict, _) => {
                warn!(
                    target: "security",
                    "MODULE REJECTED: {} is {} ({})",
                    path, verdict, self.outcome
                );
            }
        }
    }
}

/// Signature verifier plus path policy, run in that order
#[derive(Debug, Clone, Default)]
pub struct ModuleTrustGate<V = AuthenticodeVerifier, P = SanctionedPaths> {
    verifier: V,
    paths: P,
}

impl ModuleTrustGate {
    /// Gate backed by the platform trust service and the sanctioned roots
    pub fn platform() -> Self {
        ModuleTrustGate::new(AuthenticodeVerifier, SanctionedPaths)
    }
}

impl<V: SignatureVerifier, P: PathPolicy> ModuleTrustGate<V, P> {
    pub fn new(verifier: V, paths: P) -> Self {
        ModuleTrustGate { verifier, paths }
    }

    /// Decide on an already-resolved module
    pub fn evaluate(&self, module: &ModuleIdentity, roots: &RootConfig) -> TrustReport {
        let outcome = self.verifier.verify(&module.resolved_path);

        let (matched_root, verdict) = match outcome.rejection() {
            Some(verdict) => {
                debug!("Signature check failed, skipping path check");
                (None, verdict)
            }
            None => {
                let sanctioned = roots.sanctioned_roots();
                match self.paths.check(module, &sanctioned) {
                    Some(root) => (Some(root), TrustVerdict::Trusted),
                    None => (None, TrustVerdict::Untrusted),
                }
            }
        };

        TrustReport {
            module: module.clone(),
            outcome,
            matched_root,
            verdict,
        }
    }

    /// Resolve a module handle, then decide against the current environment
    pub fn verify_module_trust<R: ModuleResolver>(
        &self,
        resolver: &R,
        handle: &R::Handle,
        expected_name: &str,
    ) -> Result<TrustReport, TrustError> {
        self.verify_with_roots(resolver, handle, expected_name, &RootConfig::from_env())
    }

    /// Resolve a module handle, then decide against explicit roots
    pub fn verify_with_roots<R: ModuleResolver>(
        &self,
        resolver: &R,
        handle: &R::Handle,
        expected_name: &str,
        roots: &RootConfig,
    ) -> Result<TrustReport, TrustError> {
        let module = ModuleIdentity::resolve(resolver, handle, expected_name)?;
        let report = self.evaluate(&module, roots);
        report.log();
        Ok(report)
    }
}

/// Check a module loaded into this process.
///
/// Returns `Ok(false)` for any trust failure; `Err` only when the module's
/// path cannot be resolved or the name is unusable.
#[cfg(windows)]
pub fn verify_module_trust(
    handle: crate::trust::module::ModuleHandle,
    expected_name: &str,
) -> Result<bool, TrustError> {
    let report = ModuleTrustGate::platform().verify_module_trust(
        &crate::trust::module::LoadedModuleResolver,
        &handle,
        expected_name,
    )?;
    Ok(report.is_trusted())
}
