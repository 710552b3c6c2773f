//! Transfer Executors
//!
//! One capability, two deployments:
//!
//! ```text
//! ┌────────────────────┐      quote_balance / execute_transfer
//! │    Distributor     │ ─────────────────────────────────────┐
//! └────────────────────┘                                      │
//!            ▼                                                ▼
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │ NativeExecutor               │     │ GatewayExecutor              │
//! │ sign + author_submitTx (node)│     │ find balances + transfer     │
//! └──────────────────────────────┘     └──────────────────────────────┘
//! ```
//!
//! The executor is chosen once at startup from `TransferMode`.

mod gateway;
mod native;

pub use gateway::GatewayExecutor;
pub use native::NativeExecutor;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::crypto::SigningError;
use crate::rpc::RpcError;
use crate::types::{Recipient, TransferReceipt, TransferRequest};

/// Transfer failures
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("Invalid balance value: {0:?}")]
    InvalidBalance(String),

    #[error("Invalid transfer amount: {0}")]
    InvalidAmount(f64),
}

/// Moves tokens from the configured account to a recipient
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Balance of `symbol` held by `account`
    async fn quote_balance(&self, account: &str, symbol: &str) -> Result<f64, TransferError>;

    /// Amount as it will go on the wire, after rounding to the token precision
    fn wire_amount(&self, amount: f64) -> f64 {
        amount
    }

    /// Perform one transfer. Errors are returned, never swallowed.
    async fn execute_transfer(&self, request: &TransferRequest)
        -> Result<TransferReceipt, TransferError>;
}

/// Supplies the delegators of an account, used as the recipient list
#[async_trait]
pub trait DelegationSource: Send + Sync {
    async fn delegators(&self, account: &str, symbol: &str) -> Result<Vec<Recipient>, TransferError>;
}

/// Check the sender's balance, then transfer if it covers the amount.
///
/// Every failure is logged and reported as `false`; when the balance is
/// short no transfer call is made.
pub async fn transfer_if_funded(
    executor: &dyn TransferExecutor,
    sender: &str,
    request: &TransferRequest,
) -> bool {
    let balance = match executor.quote_balance(sender, &request.symbol).await {
        Ok(balance) => balance,
        Err(e) => {
            error!("Error fetching {} balance of {}: {}", request.symbol, sender, e);
            return false;
        }
    };

    let needed = executor.wire_amount(request.amount);
    if balance < needed {
        warn!(
            "Insufficient balance: {} has {} {}, needs {}",
            sender, balance, request.symbol, needed
        );
        return false;
    }

    match executor.execute_transfer(request).await {
        Ok(_) => {
            info!("Transferred {} {} to {}", request.amount, request.symbol, request.recipient);
            true
        }
        Err(e) => {
            error!("Error transferring tokens to {}: {}", request.recipient, e);
            false
        }
    }
}

/// Parse a decimal quantity returned by an upstream
pub(crate) fn parse_balance(value: &str) -> Result<f64, TransferError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TransferError::InvalidBalance(value.to_string()))
}

/// Parse a balance that may arrive as a decimal string or a bare number
pub(crate) fn parse_balance_value(value: &serde_json::Value) -> Result<f64, TransferError> {
    match value {
        serde_json::Value::String(s) => parse_balance(s),
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| TransferError::InvalidBalance(n.to_string())),
        other => Err(TransferError::InvalidBalance(other.to_string())),
    }
}

/// Reject amounts no upstream would accept
pub(crate) fn check_amount(amount: f64) -> Result<(), TransferError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(TransferError::InvalidAmount(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBalance {
        balance: Result<f64, ()>,
        fail_transfer: bool,
        transfers: AtomicUsize,
    }

    impl FixedBalance {
        fn new(balance: Result<f64, ()>, fail_transfer: bool) -> Self {
            Self { balance, fail_transfer, transfers: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl TransferExecutor for FixedBalance {
        async fn quote_balance(&self, _: &str, _: &str) -> Result<f64, TransferError> {
            self.balance.map_err(|_| TransferError::InvalidBalance("boom".into()))
        }

        async fn execute_transfer(
            &self,
            _: &TransferRequest,
        ) -> Result<TransferReceipt, TransferError> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            if self.fail_transfer {
                Err(TransferError::InvalidAmount(0.0))
            } else {
                Ok(TransferReceipt { id: None })
            }
        }
    }

    fn request(amount: f64) -> TransferRequest {
        TransferRequest {
            recipient: "alice".into(),
            amount,
            symbol: "PEK".into(),
            memo: String::new(),
        }
    }

    #[tokio::test]
    async fn test_short_balance_skips_transfer() {
        let executor = FixedBalance::new(Ok(0.5), false);
        assert!(!transfer_if_funded(&executor, "bot", &request(1.0)).await);
        assert_eq!(executor.transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exact_balance_is_enough() {
        let executor = FixedBalance::new(Ok(1.0), false);
        assert!(transfer_if_funded(&executor, "bot", &request(1.0)).await);
        assert_eq!(executor.transfers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_collapse_to_false() {
        let quote_fails = FixedBalance::new(Err(()), false);
        assert!(!transfer_if_funded(&quote_fails, "bot", &request(1.0)).await);
        assert_eq!(quote_fails.transfers.load(Ordering::SeqCst), 0);

        let transfer_fails = FixedBalance::new(Ok(10.0), true);
        assert!(!transfer_if_funded(&transfer_fails, "bot", &request(1.0)).await);
    }

    #[test]
    fn test_parse_balance() {
        assert_eq!(parse_balance(" 12.500 ").unwrap(), 12.5);
        assert!(parse_balance("abc").is_err());
        assert!(parse_balance("NaN").is_err());
    }

    #[tokio::test]
    async fn test_funding_check_uses_wire_amount() {
        struct Rounding(FixedBalance);

        #[async_trait]
        impl TransferExecutor for Rounding {
            async fn quote_balance(&self, a: &str, s: &str) -> Result<f64, TransferError> {
                self.0.quote_balance(a, s).await
            }

            fn wire_amount(&self, amount: f64) -> f64 {
                crate::types::round_quantity(amount, 3)
            }

            async fn execute_transfer(
                &self,
                request: &TransferRequest,
            ) -> Result<TransferReceipt, TransferError> {
                self.0.execute_transfer(request).await
            }
        }

        let executor = Rounding(FixedBalance::new(Ok(1.0), false));
        assert!(transfer_if_funded(&executor, "bot", &request(1.0004)).await);
        assert_eq!(executor.0.transfers.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_balance_value() {
        use serde_json::json;
        assert_eq!(parse_balance_value(&json!("7.250")).unwrap(), 7.25);
        assert_eq!(parse_balance_value(&json!(100.0)).unwrap(), 100.0);
        assert_eq!(parse_balance_value(&json!(3)).unwrap(), 3.0);
        assert!(parse_balance_value(&json!(null)).is_err());
        assert!(parse_balance_value(&json!({"x": 1})).is_err());
    }

    #[test]
    fn test_check_amount() {
        assert!(check_amount(0.001).is_ok());
        assert!(check_amount(0.0).is_err());
        assert!(check_amount(-1.0).is_err());
        assert!(check_amount(f64::INFINITY).is_err());
    }
}
