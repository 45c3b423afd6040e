//! Loadgate trust system - decides whether a loaded SDK module may be used
//!
//! Two checks, in order:
//! - the module's file carries an Authenticode signature chaining to a
//!   trusted root (code-signing policy, no UI, no online revocation)
//! - the module was loaded from `<sanctioned root>\<expected name>`
//!
//! Either check failing yields a non-trusted verdict. Errors are reserved for
//! callers that hand in something the gate cannot work with.

pub mod allowlist;
pub mod error;
pub mod gate;
pub mod module;
pub mod outcome;
pub mod roots;
pub mod signature;

#[cfg(windows)]
mod wintrust;

pub use allowlist::{PathPolicy, SanctionedPaths};
pub use error::TrustError;
pub use gate::{ModuleTrustGate, TrustReport};
pub use module::{FilePathResolver, ModuleIdentity, ModuleResolver};
pub use outcome::{SignatureOutcome, TrustVerdict};
pub use roots::{RootConfig, RootLabel, SanctionedRoot};
pub use signature::{AuthenticodeVerifier, SignatureVerifier};

#[cfg(windows)]
pub use gate::verify_module_trust;
#[cfg(windows)]
pub use module::{LoadedModuleResolver, ModuleHandle};
