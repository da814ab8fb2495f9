//! CommandMessage - active response command sent to agents

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Leading marker of a script reference
pub const SCRIPT_MARKER: char = '!';

/// Placeholder payload for a command without arguments
const NO_ARGUMENTS: &str = "- -";

/// Command to run on a target agent
///
/// Built once per operation and reused unmodified for every target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    command: String,
    arguments: Vec<String>,
    custom: bool,
}

impl CommandMessage {
    /// Build a command message
    ///
    /// A command starting with `!` refers to a script; `custom = true` marks
    /// it as one as well.
    ///
    /// # Errors
    /// - empty command, or command containing whitespace
    /// - argument containing control characters
    pub fn new(
        command: impl Into<String>,
        arguments: Option<Vec<String>>,
        custom: bool,
    ) -> Result<Self, ContractError> {
        let command = command.into();
        let name = command.strip_prefix(SCRIPT_MARKER).unwrap_or(&command);
        if name.trim().is_empty() {
            return Err(ContractError::invalid_argument(
                "command",
                "command cannot be empty",
            ));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ContractError::invalid_argument(
                "command",
                format!("command '{name}' contains whitespace"),
            ));
        }

        let arguments = arguments.unwrap_or_default();
        if let Some(bad) = arguments.iter().find(|a| a.chars().any(char::is_control)) {
            return Err(ContractError::invalid_argument(
                "arguments",
                format!("argument {bad:?} contains control characters"),
            ));
        }

        Ok(Self {
            command,
            arguments,
            custom,
        })
    }

    /// Command or script name without the marker
    pub fn name(&self) -> &str {
        self.command
            .strip_prefix(SCRIPT_MARKER)
            .unwrap_or(&self.command)
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    /// Whether this refers to a script rather than a configured command
    pub fn is_script(&self) -> bool {
        self.custom || self.command.starts_with(SCRIPT_MARKER)
    }

    /// Queue payload: `[!]name args...`, or `name - -` without arguments
    pub fn payload(&self) -> String {
        let mut payload = String::new();
        if self.is_script() {
            payload.push(SCRIPT_MARKER);
        }
        payload.push_str(self.name());
        payload.push(' ');
        if self.arguments.is_empty() {
            payload.push_str(NO_ARGUMENTS);
        } else {
            payload.push_str(&self.arguments.join(" "));
        }
        payload
    }
}
