//! Operation request and operation contract
//!
//! An [`OperationRequest`] names an operation, carries its keyword arguments
//! and says how the call should be routed. It is serializable so a node can
//! forward it to another node as-is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{AffectedItems, ContractError, PermissionSet};

/// Keyword arguments of an operation
pub type Kwargs = serde_json::Map<String, Value>;

/// Target list value meaning "every permitted target"
pub const ALL_TARGETS: &str = "*";

/// Where an operation executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// In-process on the receiving node
    Local,
    /// In-process on any single reachable node
    LocalAny,
    /// On the master node, forwarding when needed
    DistributedMaster,
    /// On every reachable cluster member, results merged
    DistributedBroadcast,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::LocalAny => "local_any",
            Self::DistributedMaster => "distributed_master",
            Self::DistributedBroadcast => "distributed_broadcast",
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "local_any" => Ok(Self::LocalAny),
            "distributed_master" => Ok(Self::DistributedMaster),
            "distributed_broadcast" => Ok(Self::DistributedBroadcast),
            other => Err(ContractError::InvalidRoutingMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// One logical call, built once and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Registered operation name
    pub operation: String,
    /// Keyword arguments passed to the operation
    pub kwargs: Kwargs,
    /// Name of the keyword argument holding the target list
    pub resource_arg: Option<String>,
    /// Routing mode, in wire form
    pub request_type: String,
    /// Schedule and return an acknowledgment instead of waiting
    pub is_async: bool,
    /// Disable the call timeout
    pub wait_for_complete: bool,
    /// Targets the caller may act upon
    pub permissions: PermissionSet,
    /// Indent rendered output
    pub pretty: bool,
}

impl OperationRequest {
    pub fn builder(operation: impl Into<String>) -> OperationRequestBuilder {
        OperationRequestBuilder::new(operation)
    }

    /// Parse the routing mode
    ///
    /// # Errors
    /// `InvalidRoutingMode` for anything but the four known modes
    pub fn routing_mode(&self) -> Result<RoutingMode, ContractError> {
        self.request_type.parse()
    }

    /// Copy of this request with a different routing mode
    pub fn rerouted(&self, mode: RoutingMode) -> Self {
        Self {
            request_type: mode.as_str().to_string(),
            ..self.clone()
        }
    }

    /// Copy of this request with replaced keyword arguments
    pub fn with_kwargs(&self, kwargs: Kwargs) -> Self {
        Self {
            kwargs,
            ..self.clone()
        }
    }

    /// Target list found under `resource_arg`, if the request has one
    pub fn target_list(&self) -> Option<Result<TargetList, ContractError>> {
        let arg = self.resource_arg.as_deref()?;
        Some(TargetList::from_kwargs(&self.kwargs, arg))
    }
}

/// Builder for [`OperationRequest`]
#[derive(Debug)]
pub struct OperationRequestBuilder {
    request: OperationRequest,
}

impl OperationRequestBuilder {
    fn new(operation: impl Into<String>) -> Self {
        Self {
            request: OperationRequest {
                operation: operation.into(),
                kwargs: Kwargs::new(),
                resource_arg: None,
                request_type: RoutingMode::Local.as_str().to_string(),
                is_async: false,
                wait_for_complete: false,
                permissions: PermissionSet::empty(),
                pretty: false,
            },
        }
    }

    /// Set one keyword argument
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.kwargs.insert(name.into(), value.into());
        self
    }

    /// Set the target list argument and mark it as the resource argument
    pub fn targets<I, S>(mut self, arg: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let arg = arg.into();
        let list: Vec<Value> = targets
            .into_iter()
            .map(|t| Value::String(t.into()))
            .collect();
        self.request.kwargs.insert(arg.clone(), Value::Array(list));
        self.request.resource_arg = Some(arg);
        self
    }

    /// Target every permitted identifier
    pub fn all_targets(mut self, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        self.request
            .kwargs
            .insert(arg.clone(), Value::String(ALL_TARGETS.to_string()));
        self.request.resource_arg = Some(arg);
        self
    }

    pub fn routing(mut self, mode: RoutingMode) -> Self {
        self.request.request_type = mode.as_str().to_string();
        self
    }

    /// Set the routing mode from its wire form, unchecked
    pub fn request_type(mut self, request_type: impl Into<String>) -> Self {
        self.request.request_type = request_type.into();
        self
    }

    pub fn is_async(mut self, is_async: bool) -> Self {
        self.request.is_async = is_async;
        self
    }

    pub fn wait_for_complete(mut self, wait: bool) -> Self {
        self.request.wait_for_complete = wait;
        self
    }

    pub fn permissions(mut self, permissions: PermissionSet) -> Self {
        self.request.permissions = permissions;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.request.pretty = pretty;
        self
    }

    pub fn build(self) -> OperationRequest {
        self.request
    }
}

/// Parsed target list argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetList {
    /// `"*"`
    All,
    /// Explicit identifiers, in request order
    Ids(Vec<String>),
}

impl TargetList {
    /// Read the target list stored under `arg`
    ///
    /// Accepts `"*"` or an array of strings.
    pub fn from_kwargs(kwargs: &Kwargs, arg: &str) -> Result<Self, ContractError> {
        match kwargs.get(arg) {
            Some(Value::String(s)) if s == ALL_TARGETS => Ok(Self::All),
            Some(Value::Array(_)) => Ok(Self::Ids(kwargs.str_list(arg)?.unwrap_or_default())),
            Some(_) => Err(ContractError::invalid_argument(
                arg,
                "expected \"*\" or a list of identifiers",
            )),
            None => Err(ContractError::invalid_argument(arg, "missing")),
        }
    }
}

/// Typed accessors for [`Kwargs`]
pub trait KwargsExt {
    /// Required string argument
    fn required_str(&self, name: &str) -> Result<&str, ContractError>;

    /// Optional list of strings; `null` counts as absent
    fn str_list(&self, name: &str) -> Result<Option<Vec<String>>, ContractError>;

    /// Optional boolean; `null` counts as absent
    fn bool_or(&self, name: &str, default: bool) -> Result<bool, ContractError>;
}

impl KwargsExt for Kwargs {
    fn required_str(&self, name: &str) -> Result<&str, ContractError> {
        match self.get(name) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ContractError::invalid_argument(name, "expected a string")),
            None => Err(ContractError::invalid_argument(name, "missing")),
        }
    }

    fn str_list(&self, name: &str) -> Result<Option<Vec<String>>, ContractError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(ContractError::invalid_argument(
                        name,
                        "expected a list of strings",
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(ContractError::invalid_argument(name, "expected a list")),
        }
    }

    fn bool_or(&self, name: &str, default: bool) -> Result<bool, ContractError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(ContractError::invalid_argument(name, "expected a boolean")),
        }
    }
}

/// A named function the dispatcher can execute
///
/// Implementations receive the permission-filtered keyword arguments and
/// report per-item outcomes through [`AffectedItems`].
#[async_trait]
pub trait Operation: Send + Sync {
    /// Registry name, e.g. `active_response.run_command`
    fn name(&self) -> &str;

    /// Execute with the given keyword arguments
    async fn execute(&self, kwargs: Kwargs) -> Result<AffectedItems, ContractError>;
}
