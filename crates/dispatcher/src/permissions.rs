//! Permission filtering
//!
//! Narrows the target list of a request to what the caller may act upon.
//! Uncovered targets are dropped silently; only an empty permission set, or
//! a request left with no target at all, is refused.

use std::collections::BTreeMap;

use contracts::{
    ContractError, OperationRequest, PermissionResolver, PermissionSet, RbacConfig, TargetList,
    ALL_TARGETS,
};
use serde_json::Value;
use tracing::debug;

use crate::error::DispatchError;

/// Refuse requests carrying an empty permission set
pub fn ensure_permitted(request: &OperationRequest) -> Result<(), DispatchError> {
    if request.permissions.is_empty() {
        return Err(DispatchError::permission_denied(&request.operation));
    }
    Ok(())
}

/// Copy of `request` whose target list only holds permitted identifiers
///
/// `"*"` expands to every permitted identifier, sorted. Requests without a
/// resource argument pass through unchanged.
///
/// # Errors
/// - `PermissionDenied` for an empty permission set or when nothing is left
/// - `Operation` when the target list is malformed
pub fn filter_request(request: &OperationRequest) -> Result<OperationRequest, DispatchError> {
    ensure_permitted(request)?;

    let (arg, targets) = match (&request.resource_arg, request.target_list()) {
        (Some(arg), Some(targets)) => (arg, targets?),
        _ => return Ok(request.clone()),
    };

    let permitted: Vec<String> = match targets {
        TargetList::All => request.permissions.targets().map(String::from).collect(),
        TargetList::Ids(ids) => {
            let requested = ids.len();
            let kept: Vec<String> = ids
                .into_iter()
                .filter(|id| request.permissions.covers(id))
                .collect();
            if kept.len() < requested {
                debug!(
                    operation = %request.operation,
                    removed = requested - kept.len(),
                    "Targets outside permission set removed"
                );
            }
            kept
        }
    };

    if permitted.is_empty() {
        return Err(DispatchError::permission_denied(&request.operation));
    }

    let mut kwargs = request.kwargs.clone();
    kwargs.insert(
        arg.clone(),
        Value::Array(permitted.into_iter().map(Value::String).collect()),
    );
    Ok(request.with_kwargs(kwargs))
}

/// Permission resolver backed by static grants
#[derive(Debug, Clone, Default)]
pub struct StaticPermissionResolver {
    inventory: Vec<String>,
    grants: BTreeMap<String, Vec<String>>,
}

impl StaticPermissionResolver {
    pub fn new(inventory: Vec<String>, grants: BTreeMap<String, Vec<String>>) -> Self {
        Self { inventory, grants }
    }

    pub fn from_config(config: &RbacConfig) -> Self {
        Self::new(config.inventory.clone(), config.grants.clone())
    }
}

impl PermissionResolver for StaticPermissionResolver {
    fn resolve(&self, credential: &str) -> Result<PermissionSet, ContractError> {
        let Some(granted) = self.grants.get(credential) else {
            debug!("Unknown credential, empty permission set");
            return Ok(PermissionSet::empty());
        };

        if granted.iter().any(|t| t == ALL_TARGETS) {
            return Ok(PermissionSet::new(self.inventory.iter().cloned()));
        }
        Ok(PermissionSet::new(granted.iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::KwargsExt;

    fn request(targets: &[&str], permitted: &[&str]) -> OperationRequest {
        OperationRequest::builder("op")
            .targets("agent_list", targets.iter().copied())
            .kwarg("command", "restart-wazuh")
            .permissions(PermissionSet::new(permitted.iter().copied()))
            .build()
    }

    fn targets_of(request: &OperationRequest) -> Vec<String> {
        request.kwargs.str_list("agent_list").unwrap().unwrap()
    }

    #[test]
    fn test_only_permitted_targets_survive() {
        let filtered = filter_request(&request(&["001", "002", "003"], &["002"])).unwrap();
        assert_eq!(targets_of(&filtered), ["002"]);
        assert_eq!(filtered.kwargs["command"], "restart-wazuh");
    }

    #[test]
    fn test_order_preserved() {
        let filtered =
            filter_request(&request(&["003", "001", "002"], &["001", "002", "003"])).unwrap();
        assert_eq!(targets_of(&filtered), ["003", "001", "002"]);
    }

    #[test]
    fn test_empty_permission_set_denied() {
        let err = filter_request(&request(&["001"], &[])).unwrap_err();
        assert!(matches!(err, DispatchError::PermissionDenied { .. }));
    }

    #[test]
    fn test_nothing_left_denied() {
        let err = filter_request(&request(&["001"], &["002"])).unwrap_err();
        assert!(matches!(err, DispatchError::PermissionDenied { .. }));
    }

    #[test]
    fn test_wildcard_expands_to_permitted() {
        let request = OperationRequest::builder("op")
            .all_targets("agent_list")
            .permissions(PermissionSet::new(["002", "001"]))
            .build();
        let filtered = filter_request(&request).unwrap();
        assert_eq!(targets_of(&filtered), ["001", "002"]);
    }

    #[test]
    fn test_no_resource_arg_passes_through() {
        let request = OperationRequest::builder("op")
            .kwarg("name", "x")
            .permissions(PermissionSet::new(["001"]))
            .build();
        assert_eq!(filter_request(&request).unwrap(), request);
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticPermissionResolver::new(
            vec!["001".to_string(), "002".to_string(), "003".to_string()],
            BTreeMap::from([
                ("admin".to_string(), vec!["*".to_string()]),
                ("ops".to_string(), vec!["002".to_string()]),
            ]),
        );

        assert_eq!(resolver.resolve("admin").unwrap().targets().count(), 3);
        let ops = resolver.resolve("ops").unwrap();
        assert!(ops.covers("002"));
        assert!(!ops.covers("001"));
        assert!(resolver.resolve("nobody").unwrap().is_empty());
    }
}
