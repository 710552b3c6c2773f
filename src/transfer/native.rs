//! Native chain executor
//!
//! Builds a transfer transaction, signs it with the active authority and
//! broadcasts it to a chain node over JSON-RPC.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info};

use super::{check_amount, parse_balance, DelegationSource, TransferError, TransferExecutor};
use crate::crypto::AuthorityKeys;
use crate::rpc::RpcClient;
use crate::types::{
    format_quantity, round_quantity, Authority, Operation, Recipient, SignedTransaction, TokenBalance,
    Transaction, TransactionSubmitResult, TransferReceipt, TransferRequest,
};

pub struct NativeExecutor {
    rpc: RpcClient,
    account: String,
    keys: AuthorityKeys,
    precision: u32,
}

impl NativeExecutor {
    pub fn new(rpc: RpcClient, account: &str, keys: AuthorityKeys, precision: u32) -> Self {
        Self {
            rpc,
            account: account.to_string(),
            keys,
            precision,
        }
    }

    /// Get the next nonce for the paying account
    async fn nonce(&self) -> Result<u64, TransferError> {
        Ok(self.rpc.call("state_getNonce", json!([self.account])).await?)
    }

    /// Token balance row, including delegators
    async fn token_balance(&self, account: &str, symbol: &str) -> Result<TokenBalance, TransferError> {
        Ok(self
            .rpc
            .call("state_getTokenBalance", json!([account, symbol]))
            .await?)
    }

    fn build_transfer(&self, request: &TransferRequest, nonce: u64) -> Transaction {
        Transaction {
            sender: self.account.clone(),
            nonce,
            operations: vec![Operation::Transfer {
                from: self.account.clone(),
                to: request.recipient.clone(),
                amount: format!(
                    "{} {}",
                    format_quantity(request.amount, self.precision),
                    request.symbol
                ),
                memo: request.memo.clone(),
            }],
            timestamp: unix_now(),
        }
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TransactionSubmitResult, TransferError> {
        let tx_json = json!({
            "transaction": tx.transaction,
            "authority": tx.authority,
            "signer": format!("0x{}", hex::encode(tx.signer)),
            "signature": format!("0x{}", hex::encode(tx.signature)),
        });

        Ok(self.rpc.call("author_submitTransaction", json!([tx_json])).await?)
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        check_amount(round_quantity(request.amount, self.precision))?;

        let nonce = self.nonce().await?;
        let tx = self.build_transfer(request, nonce);
        let signed = self.keys.sign_transaction(tx, Authority::Active)?;
        debug!("Signed transfer to {} with nonce {}", request.recipient, nonce);

        let result = self.broadcast(&signed).await?;
        Ok(TransferReceipt { id: Some(result.hash) })
    }
}

#[async_trait]
impl TransferExecutor for NativeExecutor {
    async fn quote_balance(&self, account: &str, symbol: &str) -> Result<f64, TransferError> {
        let row = self.token_balance(account, symbol).await?;
        parse_balance(&row.balance)
    }

    fn wire_amount(&self, amount: f64) -> f64 {
        round_quantity(amount, self.precision)
    }

    async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        match self.transfer(request).await {
            Ok(receipt) => {
                info!(
                    "Transferred {} {} to {} (tx {})",
                    request.amount,
                    request.symbol,
                    request.recipient,
                    receipt.id.as_deref().unwrap_or("?")
                );
                Ok(receipt)
            }
            Err(e) => {
                error!("Error transferring tokens: {}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl DelegationSource for NativeExecutor {
    async fn delegators(&self, account: &str, symbol: &str) -> Result<Vec<Recipient>, TransferError> {
        let row = self.token_balance(account, symbol).await?;
        Ok(row
            .delegations
            .into_iter()
            .map(|d| Recipient {
                account: d.account,
                balance: d.balance,
            })
            .collect())
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
