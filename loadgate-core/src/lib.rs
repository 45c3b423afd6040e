//! Loadgate core library exports

pub mod trust;

pub use trust::{ModuleTrustGate, RootConfig, TrustError, TrustReport, TrustVerdict};
