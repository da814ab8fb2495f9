//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (validator derive): node name 非空, timeout > 0, queue_path 非空
//! - cluster member name 唯一
//! - cluster 启用时：恰好一个 master，本节点必须是成员且角色一致
//! - command 名称非空且不含空白
//! - rbac grants 只能引用 inventory 中的 ID 或 `*`

use std::collections::HashSet;

use contracts::{ContractError, NodeRole, ServiceConfig, ALL_TARGETS};
use validator::{Validate, ValidationErrors};

/// 校验 ServiceConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_member_names(config)?;
    validate_cluster_roles(config)?;
    validate_commands(config)?;
    validate_grants(config)?;
    Ok(())
}

/// 字段级校验
fn validate_fields(config: &ServiceConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        ContractError::config_validation(first_field(&errors), errors.to_string())
    })
}

fn first_field(errors: &ValidationErrors) -> String {
    errors
        .errors()
        .keys()
        .next()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "config".to_string())
}

/// 校验 member name 唯一性
fn validate_member_names(config: &ServiceConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for member in &config.cluster.members {
        if !seen.insert(&member.name) {
            return Err(ContractError::config_validation(
                format!("cluster.members[name={}]", member.name),
                "duplicate member name",
            ));
        }
    }
    Ok(())
}

/// 校验集群角色
fn validate_cluster_roles(config: &ServiceConfig) -> Result<(), ContractError> {
    if !config.cluster.enabled {
        return Ok(());
    }

    let masters = config
        .cluster
        .members
        .iter()
        .filter(|m| m.role == NodeRole::Master)
        .count();
    if masters != 1 {
        return Err(ContractError::config_validation(
            "cluster.members",
            format!("exactly one master required, found {masters}"),
        ));
    }

    let local = config
        .cluster
        .members
        .iter()
        .find(|m| m.name == config.node.name)
        .ok_or_else(|| {
            ContractError::config_validation(
                "node.name",
                format!("node '{}' is not a cluster member", config.node.name),
            )
        })?;

    if local.role != config.node.role {
        return Err(ContractError::config_validation(
            "node.role",
            format!(
                "node role {:?} does not match member role {:?}",
                config.node.role, local.role
            ),
        ));
    }

    Ok(())
}

/// 校验命令目录
fn validate_commands(config: &ServiceConfig) -> Result<(), ContractError> {
    for (idx, command) in config.active_response.commands.iter().enumerate() {
        if command.is_empty() || command.chars().any(char::is_whitespace) {
            return Err(ContractError::config_validation(
                format!("active_response.commands[{idx}]"),
                format!("invalid command name {command:?}"),
            ));
        }
    }
    Ok(())
}

/// 校验权限授予
fn validate_grants(config: &ServiceConfig) -> Result<(), ContractError> {
    let inventory: HashSet<&str> = config.rbac.inventory.iter().map(String::as_str).collect();
    for (credential, targets) in &config.rbac.grants {
        for target in targets {
            if target != ALL_TARGETS && !inventory.contains(target.as_str()) {
                return Err(ContractError::config_validation(
                    format!("rbac.grants.{credential}"),
                    format!("target '{target}' is not in rbac.inventory"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_toml;

    const CLUSTER: &str = r#"
[node]
name = "master-node"

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

    #[test]
    fn test_valid_cluster() {
        let config = parse_toml(CLUSTER).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let content = format!("{CLUSTER}\n[dispatch]\nrequest_timeout_ms = 0\n");
        let config = parse_toml(&content).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("request_timeout_ms"));
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let content = CLUSTER.replace("worker-1", "master-node");
        let config = parse_toml(&content).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_two_masters_rejected() {
        let content = format!(
            "{CLUSTER}\n[[cluster.members]]\nname = \"m2\"\naddress = \"x\"\nrole = \"master\"\n"
        );
        let config = parse_toml(&content).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("exactly one master"));
    }

    #[test]
    fn test_local_node_must_be_member() {
        let content = CLUSTER.replacen("name = \"master-node\"", "name = \"ghost\"", 1);
        let config = parse_toml(&content).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("not a cluster member"));
    }

    #[test]
    fn test_role_mismatch_rejected() {
        let content = CLUSTER.replacen(
            "name = \"master-node\"\n",
            "name = \"master-node\"\nrole = \"worker\"\n",
            1,
        );
        let config = parse_toml(&content).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_bad_command_rejected() {
        let content = format!("{CLUSTER}\n[active_response]\ncommands = [\"restart wazuh\"]\n");
        let config = parse_toml(&content).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_grant_outside_inventory_rejected() {
        let content = format!(
            "{CLUSTER}\n[rbac]\ninventory = [\"001\"]\n[rbac.grants]\nops = [\"001\", \"009\"]\n"
        );
        let config = parse_toml(&content).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("009"));
    }
}
