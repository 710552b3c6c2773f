//! Core types for the reward bot
//!
//! Recipients and transfer requests live only for the duration of one
//! `/distribute` call. Nothing here is persisted.

use serde::{Deserialize, Serialize};

// =============================================================================
// DISTRIBUTION
// =============================================================================

/// A potential reward recipient and the balance observed for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub account: String,
    pub balance: f64,
}

impl Recipient {
    /// Strictly greater than the minimum; a balance equal to it does not qualify.
    pub fn qualifies(&self, minimum_balance: f64) -> bool {
        self.balance > minimum_balance
    }
}

/// One transfer to perform
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: f64,
    pub symbol: String,
    pub memo: String,
}

/// What an executor reports back for a transfer it completed
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// Transaction hash (native) or gateway-assigned id, if any
    pub id: Option<String>,
}

/// Outcome of one `/distribute` run, used for logging and metrics only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionReport {
    /// Recipients looked at
    pub considered: usize,
    /// Below minimum balance, or not payable
    pub skipped: usize,
    /// Transfers that went through
    pub sent: usize,
    /// Transfers that were attempted and failed
    pub failed: usize,
}

/// Body accepted by `POST /distribute` in gateway mode
#[derive(Debug, Clone, Deserialize)]
pub struct DistributeBody {
    pub recipient: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Format a token quantity with a fixed number of decimals, e.g. `"1.000"`
pub fn format_quantity(amount: f64, precision: u32) -> String {
    format!("{:.*}", precision as usize, amount)
}

/// The amount actually sent once formatted with `precision` decimals
pub fn round_quantity(amount: f64, precision: u32) -> f64 {
    format_quantity(amount, precision).parse().unwrap_or(amount)
}

// =============================================================================
// NATIVE CHAIN
// =============================================================================

/// Authority level a transaction is signed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    Active,
    Posting,
}

/// Operations understood by the chain node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Token transfer. `amount` is `"<quantity> <SYMBOL>"`.
    Transfer {
        from: String,
        to: String,
        amount: String,
        memo: String,
    },
}

/// Unsigned transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub nonce: u64,
    pub operations: Vec<Operation>,
    pub timestamp: u64,
}

/// Signed transaction ready for broadcast
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub authority: Authority,
    pub signer: [u8; 32],
    pub signature: [u8; 64],
}

/// Delegation entry as returned by the node
#[derive(Debug, Clone, Deserialize)]
pub struct Delegation {
    pub account: String,
    pub balance: f64,
}

/// Token balance row for one account, with its delegators
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBalance {
    pub balance: String,
    #[serde(default)]
    pub delegations: Vec<Delegation>,
}

/// Result of `author_submitTransaction`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSubmitResult {
    pub hash: String,
}

// =============================================================================
// TOKEN GATEWAY
// =============================================================================

/// Row of the gateway `balances` table. `balance` is usually a decimal
/// string but some gateways send a bare number.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceRow {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    pub balance: serde_json::Value,
}
