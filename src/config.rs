//! Bot Configuration
//!
//! Process-wide settings, built once at startup and shared read-only with
//! every request handler. Layering order is defaults, optional TOML file,
//! environment variables, then command line overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::crypto::AuthorityKeys;

/// Environment variable names
pub const ENV_ACCOUNT_NAME: &str = "HIVE_ACCOUNT_NAME";
pub const ENV_ACTIVE_KEY: &str = "HIVE_ACTIVE_KEY";
pub const ENV_POSTING_KEY: &str = "HIVE_POSTING_KEY";
pub const ENV_TOKEN_SYMBOL: &str = "TOKEN_SYMBOL";
pub const ENV_MINIMUM_BALANCE: &str = "MINIMUM_BALANCE";
pub const ENV_REWARD_AMOUNT: &str = "REWARD_AMOUNT";
pub const ENV_MEMO: &str = "MEMO";
pub const ENV_TRANSFER_MODE: &str = "TRANSFER_MODE";
pub const ENV_NODE_RPC_URL: &str = "NODE_RPC_URL";
pub const ENV_GATEWAY_RPC_URL: &str = "GATEWAY_RPC_URL";
pub const ENV_TOKEN_PRECISION: &str = "TOKEN_PRECISION";
pub const ENV_LOG_FILE: &str = "BOT_LOG_FILE";

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingIdentity(Vec<&'static str>),

    #[error("Invalid {name} key: {reason}")]
    InvalidKey { name: &'static str, reason: String },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How rewards are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Signed transaction broadcast to a chain node, recipients from delegations
    Native,
    /// Token gateway JSON-RPC, single explicit recipient per request
    Gateway,
}

impl FromStr for TransferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(TransferMode::Native),
            "gateway" => Ok(TransferMode::Gateway),
            other => Err(format!("unknown transfer mode '{}'", other)),
        }
    }
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferMode::Native => write!(f, "native"),
            TransferMode::Gateway => write!(f, "gateway"),
        }
    }
}

/// Main configuration for the reward bot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    // === Identity ===

    /// Account paying the rewards
    pub account_name: String,

    /// Active authority secret (hex), signs transfers
    pub active_key: String,

    /// Posting authority secret (hex)
    pub posting_key: String,

    // === Reward policy ===

    /// Token being distributed
    pub token_symbol: String,

    /// Delegators must hold strictly more than this to qualify
    pub minimum_balance: f64,

    /// Amount sent to each qualifying recipient
    pub reward_amount: f64,

    /// Memo attached to every transfer
    pub memo: String,

    /// Decimal places used when formatting token quantities
    pub token_precision: u32,

    // === Transport ===

    pub transfer_mode: TransferMode,

    /// Chain node JSON-RPC endpoint (native mode)
    pub node_rpc_url: String,

    /// Token gateway JSON-RPC endpoint (gateway mode)
    pub gateway_rpc_url: String,

    /// Contract holding token balances on the gateway
    pub gateway_contract: String,

    /// Timeout applied to every outbound request (seconds)
    pub rpc_timeout_secs: u64,

    // === Server ===

    pub listen_host: String,

    pub listen_port: u16,

    /// Append-only log file
    pub log_file: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            account_name: String::new(),
            active_key: String::new(),
            posting_key: String::new(),

            token_symbol: "PEK".to_string(),
            minimum_balance: 0.0,
            reward_amount: 1.0,
            memo: "Thanks for participating!".to_string(),
            token_precision: 3,

            transfer_mode: TransferMode::Native,
            node_rpc_url: "http://127.0.0.1:9933".to_string(),
            gateway_rpc_url: "https://api.hive-engine.com/rpc/contracts".to_string(),
            gateway_contract: "tokens".to_string(),
            rpc_timeout_secs: 30,

            listen_host: "0.0.0.0".to_string(),
            listen_port: 5000,
            log_file: "reward_bot.log".to_string(),
        }
    }
}

impl BotConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overlay values from the environment.
    ///
    /// Takes a lookup function instead of reading `std::env` directly so the
    /// overlay can be exercised with a plain map.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_ACCOUNT_NAME) {
            self.account_name = v.trim().to_string();
        }
        if let Some(v) = get(ENV_ACTIVE_KEY) {
            self.active_key = v.trim().to_string();
        }
        if let Some(v) = get(ENV_POSTING_KEY) {
            self.posting_key = v.trim().to_string();
        }
        if let Some(v) = get(ENV_TOKEN_SYMBOL) {
            self.token_symbol = v.trim().to_string();
        }
        if let Some(v) = get(ENV_MINIMUM_BALANCE) {
            self.minimum_balance = parse_var(ENV_MINIMUM_BALANCE, &v)?;
        }
        if let Some(v) = get(ENV_REWARD_AMOUNT) {
            self.reward_amount = parse_var(ENV_REWARD_AMOUNT, &v)?;
        }
        if let Some(v) = lookup(ENV_MEMO) {
            self.memo = v;
        }
        if let Some(v) = get(ENV_TRANSFER_MODE) {
            self.transfer_mode = parse_var(ENV_TRANSFER_MODE, &v)?;
        }
        if let Some(v) = get(ENV_NODE_RPC_URL) {
            self.node_rpc_url = v.trim().to_string();
        }
        if let Some(v) = get(ENV_GATEWAY_RPC_URL) {
            self.gateway_rpc_url = v.trim().to_string();
        }
        if let Some(v) = get(ENV_TOKEN_PRECISION) {
            self.token_precision = parse_var(ENV_TOKEN_PRECISION, &v)?;
        }
        if let Some(v) = get(ENV_LOG_FILE) {
            self.log_file = v.trim().to_string();
        }

        Ok(self)
    }

    // Builder-style methods for CLI overrides

    pub fn with_listen_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.listen_port = port;
        }
        self
    }

    pub fn with_transfer_mode(mut self, mode: Option<TransferMode>) -> Self {
        if let Some(mode) = mode {
            self.transfer_mode = mode;
        }
        self
    }

    pub fn with_log_file(mut self, path: Option<String>) -> Self {
        if let Some(path) = path {
            self.log_file = path;
        }
        self
    }

    /// Validate configuration values.
    ///
    /// The three identity fields are checked together so the error names
    /// every missing variable at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.account_name.is_empty() {
            missing.push(ENV_ACCOUNT_NAME);
        }
        if self.active_key.is_empty() {
            missing.push(ENV_ACTIVE_KEY);
        }
        if self.posting_key.is_empty() {
            missing.push(ENV_POSTING_KEY);
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingIdentity(missing));
        }

        // Both authorities must be usable, even though only active signs
        AuthorityKeys::from_hex(&self.active_key, &self.posting_key)?;

        if self.token_symbol.is_empty() {
            return Err(ConfigError::Invalid("token_symbol must not be empty".to_string()));
        }

        if !self.reward_amount.is_finite() || self.reward_amount <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "reward_amount ({}) must be a positive number",
                self.reward_amount
            )));
        }

        if !self.minimum_balance.is_finite() || self.minimum_balance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "minimum_balance ({}) must not be negative",
                self.minimum_balance
            )));
        }

        if self.token_precision > 8 {
            return Err(ConfigError::Invalid(format!(
                "token_precision ({}) must be at most 8",
                self.token_precision
            )));
        }

        Ok(())
    }

    /// Load the signing authorities. Only valid after `validate()` succeeded.
    pub fn authority_keys(&self) -> Result<AuthorityKeys, ConfigError> {
        AuthorityKeys::from_hex(&self.active_key, &self.posting_key)
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}
