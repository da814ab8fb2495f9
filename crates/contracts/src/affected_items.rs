//! AffectedItems - per-item result aggregation for multi-target operations
//!
//! Every operation that acts on several targets reports through this type:
//! which items succeeded (in processing order), which failed and why, and a
//! summary message picked from three templates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::AggregateError;

/// Category of a per-item failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Queue/transport refused the message for this target
    Transport,
    /// Target identifier cannot receive this operation
    InvalidTarget,
    /// Cluster node could not be reached (broadcast only)
    RemoteUnreachable,
    /// Cluster node answered with a call-level error (broadcast only)
    Remote,
}

impl ErrorKind {
    /// Wire form, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::InvalidTarget => "invalid_target",
            Self::RemoteUnreachable => "remote_unreachable",
            Self::Remote => "remote",
        }
    }
}

/// Prefix of failed-mapping keys that name a cluster node
pub const NODE_KEY_PREFIX: &str = "node:";

/// Failed-mapping key for a whole cluster node
pub fn node_key(node: &str) -> String {
    format!("{NODE_KEY_PREFIX}{node}")
}

/// Why a single item failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// Item identifier the failure belongs to
    pub target: String,
    /// Failure category
    pub kind: ErrorKind,
    /// Human-readable reason
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(target: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Summary templates for the three possible outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryMessages {
    /// Nothing succeeded, at least one failure
    pub none: String,
    /// Some succeeded, some failed
    pub some: String,
    /// No failures
    pub all: String,
}

/// Aggregated success/failure record of one multi-target operation
///
/// # Invariants
/// - `total_affected_items == affected_items.len()`
/// - an identifier is in at most one of `affected_items` / `failed_items`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedItems {
    affected_items: Vec<String>,
    failed_items: BTreeMap<String, ErrorDescriptor>,
    total_affected_items: usize,
    messages: SummaryMessages,
}

impl AffectedItems {
    /// Create an empty aggregator with the three summary templates
    pub fn new(
        none_msg: impl Into<String>,
        some_msg: impl Into<String>,
        all_msg: impl Into<String>,
    ) -> Self {
        Self::with_messages(SummaryMessages {
            none: none_msg.into(),
            some: some_msg.into(),
            all: all_msg.into(),
        })
    }

    /// Create an empty aggregator from existing templates
    pub fn with_messages(messages: SummaryMessages) -> Self {
        Self {
            affected_items: Vec::new(),
            failed_items: BTreeMap::new(),
            total_affected_items: 0,
            messages,
        }
    }

    /// Record a successful item
    ///
    /// # Errors
    /// `DuplicateItem` if `id` was already recorded as succeeded or failed
    pub fn add_success(&mut self, id: impl Into<String>) -> Result<(), AggregateError> {
        let id = id.into();
        self.ensure_new(&id)?;
        self.affected_items.push(id);
        self.total_affected_items += 1;
        Ok(())
    }

    /// Record a failed item
    ///
    /// # Errors
    /// `DuplicateItem` if `id` was already recorded as succeeded or failed
    pub fn add_failed_item(
        &mut self,
        id: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Result<(), AggregateError> {
        let id = id.into();
        self.ensure_new(&id)?;
        let descriptor = ErrorDescriptor::new(id.clone(), kind, message);
        self.failed_items.insert(id, descriptor);
        Ok(())
    }

    /// Record a cluster node that failed as a whole
    ///
    /// Node entries live under `node:<name>` in the failed mapping, apart
    /// from target identifiers. Returns the key used.
    ///
    /// # Errors
    /// `DuplicateItem` if the same node was already recorded
    pub fn add_failed_node(
        &mut self,
        node: &str,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Result<String, AggregateError> {
        let key = node_key(node);
        self.add_failed_item(key.clone(), kind, message)?;
        Ok(key)
    }

    fn ensure_new(&self, id: &str) -> Result<(), AggregateError> {
        if self.contains(id) {
            return Err(AggregateError::DuplicateItem { id: id.to_string() });
        }
        Ok(())
    }

    /// Whether `id` was already recorded either way
    pub fn contains(&self, id: &str) -> bool {
        self.failed_items.contains_key(id) || self.affected_items.iter().any(|a| a == id)
    }

    /// Succeeded identifiers in processing order
    pub fn affected_items(&self) -> &[String] {
        &self.affected_items
    }

    /// Failed identifiers and their descriptors
    pub fn failed_items(&self) -> &BTreeMap<String, ErrorDescriptor> {
        &self.failed_items
    }

    pub fn total_affected_items(&self) -> usize {
        self.total_affected_items
    }

    pub fn total_failed_items(&self) -> usize {
        self.failed_items.len()
    }

    pub fn messages(&self) -> &SummaryMessages {
        &self.messages
    }

    /// Nothing recorded yet
    pub fn is_empty(&self) -> bool {
        self.affected_items.is_empty() && self.failed_items.is_empty()
    }

    /// Pick the summary template matching the recorded outcome
    ///
    /// # Errors
    /// `NothingToReport` if no item was recorded
    pub fn summary(&self) -> Result<&str, AggregateError> {
        match (self.affected_items.is_empty(), self.failed_items.is_empty()) {
            (true, true) => Err(AggregateError::NothingToReport),
            (_, true) => Ok(&self.messages.all),
            (true, false) => Ok(&self.messages.none),
            (false, false) => Ok(&self.messages.some),
        }
    }

    /// Merge another node's result into this one
    ///
    /// Items are appended in `other`'s order. A success reported by any node
    /// wins over failures for the same identifier; among failures the first
    /// one recorded is kept.
    ///
    /// Returns the number of ignored entries.
    pub fn merge(&mut self, other: AffectedItems) -> usize {
        let mut ignored = 0;
        for id in other.affected_items {
            self.failed_items.remove(&id);
            if self.add_success(id).is_err() {
                ignored += 1;
            }
        }
        for (id, descriptor) in other.failed_items {
            if self.contains(&id) {
                ignored += 1;
                continue;
            }
            self.failed_items.insert(id, descriptor);
        }
        ignored
    }

    /// Build the caller-facing response
    ///
    /// Failed items are grouped by identical error.
    ///
    /// # Errors
    /// `NothingToReport` if no item was recorded
    pub fn finalize(&self) -> Result<OperationResponse, AggregateError> {
        let message = self.summary()?.to_string();

        let mut groups: Vec<FailedGroup> = Vec::new();
        for descriptor in self.failed_items.values() {
            let reason = FailureReason {
                kind: descriptor.kind,
                message: descriptor.message.clone(),
            };
            match groups.iter_mut().find(|g| g.error == reason) {
                Some(group) => group.id.push(descriptor.target.clone()),
                None => groups.push(FailedGroup {
                    error: reason,
                    id: vec![descriptor.target.clone()],
                }),
            }
        }

        Ok(OperationResponse {
            message,
            data: ItemsPayload {
                affected_items: self.affected_items.clone(),
                total_affected_items: self.total_affected_items,
                failed_items: groups,
                total_failed_items: self.failed_items.len(),
            },
        })
    }
}

/// Caller-facing result of a multi-target operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResponse {
    /// Summary message
    pub message: String,
    /// Item details
    pub data: ItemsPayload,
}

impl OperationResponse {
    /// Serialize as JSON, indented when `pretty` is set
    pub fn render(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Item section of an [`OperationResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsPayload {
    pub affected_items: Vec<String>,
    pub total_affected_items: usize,
    pub failed_items: Vec<FailedGroup>,
    pub total_failed_items: usize,
}

/// Failed identifiers sharing one error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedGroup {
    pub error: FailureReason,
    pub id: Vec<String>,
}

/// Error part of a [`FailedGroup`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}
