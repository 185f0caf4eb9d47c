//! Configuration management for the cosign client

use alloy::primitives::Address;
use cosign_types::parse_ether;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::coordinator::{ApprovalMode, ConfirmationPolicy};
use crate::wallet::SafeContracts;

/// Environment variables that override the file
pub const ENV_RPC_URL: &str = "COSIGN_RPC_URL";
pub const ENV_RELAY_URL: &str = "COSIGN_RELAY_URL";
pub const ENV_SAFE_ADDRESS: &str = "COSIGN_SAFE_ADDRESS";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("io error:: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml parsing error:: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("toml serialization error:: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("unknown configuration key:: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}:: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Chain and relay endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the chain
    pub rpc_url: String,
    pub chain_id: u64,
    /// Safe Transaction Service base URL
    pub relay_url: String,
    /// Block explorer used for printed links
    pub explorer_url: String,
    /// Network prefix of the Safe web app (`sep`, `eth`, `gor`, ...)
    pub app_prefix: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            chain_id: 11_155_111,
            relay_url: "https://safe-transaction-sepolia.safe.global".to_string(),
            explorer_url: "https://sepolia.etherscan.io".to_string(),
            app_prefix: "sep".to_string(),
        }
    }
}

/// Parameters of the propose / confirm / execute workflow.
///
/// Owner entries are key names resolved through the keyring, or literal
/// addresses for owners whose keys this process never holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Existing Safe; when unset `run` deploys a new one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_address: Option<Address>,
    pub owners: Vec<String>,
    pub threshold: u64,
    /// Owner that deploys and proposes
    pub proposer: String,
    /// Second owner that confirms
    pub confirmer: String,
    /// Owner that sends `execTransaction`
    pub executor: String,
    /// Account that funds a freshly deployed Safe
    pub funder: String,
    /// Ether sent to a freshly deployed Safe
    pub fund_amount: String,
    /// Ether moved by the proposed transaction
    pub transfer_amount: String,
    /// Recipient; when unset the Safe sends to itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Address>,
    #[serde(default)]
    pub approval: ApprovalMode,
    #[serde(default)]
    pub on_confirm_failure: ConfirmationPolicy,
    /// Proxy factory salt; when unset the current time is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt_nonce: Option<u64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            safe_address: None,
            owners: vec!["owner1".into(), "owner2".into(), "owner3".into()],
            threshold: 2,
            proposer: "owner1".to_string(),
            confirmer: "owner2".to_string(),
            executor: "owner1".to_string(),
            funder: "owner1".to_string(),
            fund_amount: "0.01".to_string(),
            transfer_amount: "0.005".to_string(),
            destination: None,
            approval: ApprovalMode::default(),
            on_confirm_failure: ConfirmationPolicy::default(),
            salt_nonce: None,
        }
    }
}

impl WorkflowConfig {
    /// Key names the workflow may need, without duplicates or literal addresses
    pub fn key_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let roles = [&self.proposer, &self.confirmer, &self.executor, &self.funder];
        for name in self.owners.iter().chain(roles) {
            if name.parse::<Address>().is_err() && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub contracts: SafeContracts,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

impl ClientConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Configuration directory, `~/.cosign` unless `home` is given
    pub fn config_dir(home: Option<&Path>) -> PathBuf {
        match home {
            Some(home) => home.to_path_buf(),
            None => dirs::home_dir()
                .map(|home| home.join(".cosign"))
                .unwrap_or_else(|| PathBuf::from(".cosign")),
        }
    }

    pub fn config_file(home: Option<&Path>) -> PathBuf {
        Self::config_dir(home).join("config.toml")
    }

    /// Load configuration from the config directory or fall back to defaults
    pub fn load_or_default(home: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = Self::config_file(home);

        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Initialize configuration directory and file
    pub fn init(home: Option<&Path>, overwrite: bool) -> Result<Self, ConfigError> {
        let config_dir = Self::config_dir(home);
        let config_file = Self::config_file(home);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        if config_file.exists() && !overwrite {
            return Self::load_from_file(config_file);
        }

        let config = Self::default();
        config.save_to_file(config_file)?;
        Ok(config)
    }

    /// Apply `COSIGN_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.network.rpc_url = url;
        }
        if let Some(url) = lookup(ENV_RELAY_URL) {
            self.network.relay_url = url;
        }
        if let Some(safe) = lookup(ENV_SAFE_ADDRESS) {
            self.set("workflow.safe_address", &safe)?;
        }
        Ok(())
    }

    /// Set a configuration value by dotted key, e.g. `network.rpc_url`
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "network.rpc_url" => self.network.rpc_url = value.to_string(),
            "network.chain_id" => {
                self.network.chain_id = value.parse().map_err(|e| ConfigError::invalid(key, e))?
            }
            "network.relay_url" => self.network.relay_url = value.to_string(),
            "network.explorer_url" => self.network.explorer_url = value.to_string(),
            "network.app_prefix" => self.network.app_prefix = value.to_string(),
            "contracts.proxy_factory" => self.contracts.proxy_factory = parse_address(key, value)?,
            "contracts.singleton" => self.contracts.singleton = parse_address(key, value)?,
            "contracts.fallback_handler" => {
                self.contracts.fallback_handler = parse_address(key, value)?
            }
            "workflow.safe_address" => {
                self.workflow.safe_address = parse_optional_address(key, value)?
            }
            "workflow.owners" => {
                self.workflow.owners = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            }
            "workflow.threshold" => {
                self.workflow.threshold = value.parse().map_err(|e| ConfigError::invalid(key, e))?
            }
            "workflow.proposer" => self.workflow.proposer = value.to_string(),
            "workflow.confirmer" => self.workflow.confirmer = value.to_string(),
            "workflow.executor" => self.workflow.executor = value.to_string(),
            "workflow.funder" => self.workflow.funder = value.to_string(),
            "workflow.fund_amount" => {
                parse_ether(value).map_err(|e| ConfigError::invalid(key, e))?;
                self.workflow.fund_amount = value.to_string();
            }
            "workflow.transfer_amount" => {
                parse_ether(value).map_err(|e| ConfigError::invalid(key, e))?;
                self.workflow.transfer_amount = value.to_string();
            }
            "workflow.destination" => {
                self.workflow.destination = parse_optional_address(key, value)?
            }
            "workflow.approval" => {
                self.workflow.approval = value.parse().map_err(|e| ConfigError::invalid(key, e))?
            }
            "workflow.on_confirm_failure" => {
                self.workflow.on_confirm_failure =
                    value.parse().map_err(|e| ConfigError::invalid(key, e))?
            }
            "workflow.salt_nonce" => {
                self.workflow.salt_nonce = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().map_err(|e| ConfigError::invalid(key, e))?)
                }
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Check that endpoints and amounts parse.
    ///
    /// The threshold is not compared to the owner count here; the wallet
    /// service rejects an unsatisfiable Safe at deployment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [
            ("network.rpc_url", &self.network.rpc_url),
            ("network.relay_url", &self.network.relay_url),
            ("network.explorer_url", &self.network.explorer_url),
        ] {
            url::Url::parse(url).map_err(|e| ConfigError::invalid(key, e))?;
        }
        parse_ether(&self.workflow.fund_amount)
            .map_err(|e| ConfigError::invalid("workflow.fund_amount", e))?;
        parse_ether(&self.workflow.transfer_amount)
            .map_err(|e| ConfigError::invalid("workflow.transfer_amount", e))?;
        if self.workflow.owners.is_empty() {
            return Err(ConfigError::invalid("workflow.owners", "no owners listed"));
        }
        Ok(())
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address, ConfigError> {
    value.parse().map_err(|e| ConfigError::invalid(key, e))
}

fn parse_optional_address(key: &str, value: &str) -> Result<Option<Address>, ConfigError> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse_address(key, value).map(Some)
    }
}
