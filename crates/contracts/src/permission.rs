//! Permission set and resolver contract
//!
//! The RBAC engine lives outside this workspace. It hands the dispatcher a
//! concrete set of target identifiers the caller may act upon.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ContractError;

/// Target identifiers a caller is allowed to act upon
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    targets: BTreeSet<String>,
}

impl PermissionSet {
    /// Permission set covering the given identifiers
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// Permission set covering nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn covers(&self, target: &str) -> bool {
        self.targets.contains(target)
    }

    /// Covered identifiers, sorted
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Turns a caller credential into a permission set
pub trait PermissionResolver: Send + Sync {
    /// Resolve the permission set of `credential`
    ///
    /// Unknown credentials resolve to an empty set rather than an error; the
    /// dispatcher rejects empty sets.
    fn resolve(&self, credential: &str) -> Result<PermissionSet, ContractError>;
}
