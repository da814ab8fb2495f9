//! Command catalog
//!
//! Names of the commands configured on the agents. Script references bypass
//! the catalog.

use std::collections::BTreeSet;

use contracts::{ActiveResponseConfig, CommandMessage};

use crate::error::{ActiveResponseError, Result};

/// Known active response commands
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    commands: BTreeSet<String>,
}

impl CommandCatalog {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &ActiveResponseConfig) -> Self {
        Self::new(config.commands.iter().cloned())
    }

    pub fn contains(&self, command: &str) -> bool {
        self.commands.contains(command)
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    /// Build a command message and check it against the catalog
    ///
    /// # Errors
    /// - invalid command or arguments
    /// - `UnknownCommand` for a non-script command missing from the catalog
    pub fn create_message(
        &self,
        command: &str,
        arguments: Option<Vec<String>>,
        custom: bool,
    ) -> Result<CommandMessage> {
        let message = CommandMessage::new(command, arguments, custom)?;
        if !message.is_script() && !self.contains(message.name()) {
            return Err(ActiveResponseError::UnknownCommand {
                command: message.name().to_string(),
            });
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_command() {
        let catalog = CommandCatalog::new(["restart-wazuh"]);
        let msg = catalog.create_message("restart-wazuh", None, false).unwrap();
        assert_eq!(msg.payload(), "restart-wazuh - -");
    }

    #[test]
    fn test_unknown_command() {
        let catalog = CommandCatalog::new(["restart-wazuh"]);
        let err = catalog.create_message("rm-rf", None, false).unwrap_err();
        assert!(matches!(err, ActiveResponseError::UnknownCommand { .. }));
    }

    #[test]
    fn test_scripts_bypass_catalog() {
        let catalog = CommandCatalog::default();
        assert!(catalog.create_message("!block.sh", None, false).is_ok());
        assert!(catalog.create_message("block.sh", None, true).is_ok());
    }

    #[test]
    fn test_from_config() {
        let catalog = CommandCatalog::from_config(&ActiveResponseConfig::default());
        assert!(catalog.contains("firewall-drop"));
    }
}
