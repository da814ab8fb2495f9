//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, ServiceConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<ServiceConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<ServiceConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<ServiceConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{LogFormat, NodeRole};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[node]
name = "master-node"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.node.name, "master-node");
        assert_eq!(config.node.role, NodeRole::Master);
        assert!(!config.cluster.enabled);
        assert_eq!(config.dispatch.request_timeout_ms, 10_000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_toml_cluster() {
        let content = r#"
[node]
name = "worker-1"
role = "worker"

[cluster]
enabled = true

[[cluster.members]]
name = "master-node"
address = "10.0.0.1:1516"
role = "master"

[[cluster.members]]
name = "worker-1"
address = "10.0.0.2:1516"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.cluster.members.len(), 2);
        assert_eq!(config.cluster.members[0].role, NodeRole::Master);
        assert_eq!(config.cluster.members[1].role, NodeRole::Worker);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "node": { "name": "master-node", "role": "master" },
            "dispatch": { "request_timeout_ms": 2500 },
            "active_response": { "commands": ["restart-wazuh"] },
            "rbac": { "inventory": ["001"], "grants": { "admin": ["*"] } }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.dispatch.request_timeout_ms, 2500);
        assert_eq!(config.rbac.grants["admin"], ["*"]);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
