//! Path allow-list check
//!
//! A module passes when its resolved path is exactly `<root>\<expected_name>`
//! for some present sanctioned root, compared case-insensitively. The check
//! is plain string equality: no symlink resolution, no `..` handling, and no
//! look at the file itself.

use crate::trust::module::ModuleIdentity;
use crate::trust::roots::{RootLabel, SanctionedRoot, PATH_SEPARATOR};
use tracing::trace;

/// Decides whether a module sits in a sanctioned location
pub trait PathPolicy {
    /// Label of a root the module matches, `None` when it matches none
    fn check(&self, module: &ModuleIdentity, roots: &[SanctionedRoot]) -> Option<RootLabel>;
}

/// Production allow-list: exact, case-insensitive `<root>\<name>` match
#[derive(Debug, Clone, Copy, Default)]
pub struct SanctionedPaths;

impl PathPolicy for SanctionedPaths {
    fn check(&self, module: &ModuleIdentity, roots: &[SanctionedRoot]) -> Option<RootLabel> {
        let actual = module.resolved_path.to_string_lossy();

        roots.iter().find_map(|root| {
            let base = root.absolute_path.as_deref()?;
            let candidate = format!("{base}{PATH_SEPARATOR}{}", module.expected_name);
            trace!("Comparing {} against {}", actual, candidate);
            eq_ignore_case(&actual, &candidate).then_some(root.label)
        })
    }
}

/// Case-insensitive comparison matching the host's path semantics.
///
/// Each char is upcased one-to-one, like the NTFS upcase table; chars whose
/// uppercase form is several chars (`ß`) compare as themselves.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars().map(upcase).eq(b.chars().map(upcase))
}

fn upcase(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}
