//! Token gateway executor
//!
//! Talks to a sidechain contracts endpoint: `find` on the balances table to
//! quote, `transfer` to pay out. Quantities travel as decimal strings.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{check_amount, parse_balance_value, TransferError, TransferExecutor};
use crate::rpc::RpcClient;
use crate::types::{format_quantity, round_quantity, BalanceRow, TransferReceipt, TransferRequest};

pub struct GatewayExecutor {
    rpc: RpcClient,
    account: String,
    contract: String,
    precision: u32,
}

impl GatewayExecutor {
    pub fn new(rpc: RpcClient, account: &str, contract: &str, precision: u32) -> Self {
        Self {
            rpc,
            account: account.to_string(),
            contract: contract.to_string(),
            precision,
        }
    }
}

#[async_trait]
impl TransferExecutor for GatewayExecutor {
    async fn quote_balance(&self, account: &str, symbol: &str) -> Result<f64, TransferError> {
        let params = json!({
            "contract": self.contract,
            "table": "balances",
            "query": { "account": account, "symbol": symbol },
        });

        let rows: Vec<BalanceRow> = self.rpc.call_optional("find", params).await?.unwrap_or_default();

        // No row means the account never held the token
        match rows.first() {
            Some(row) => {
                debug!(
                    "{} holds {} {}",
                    row.account.as_deref().unwrap_or(account),
                    row.balance,
                    row.symbol.as_deref().unwrap_or(symbol)
                );
                parse_balance_value(&row.balance)
            }
            None => Ok(0.0),
        }
    }

    fn wire_amount(&self, amount: f64) -> f64 {
        round_quantity(amount, self.precision)
    }

    async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        check_amount(self.wire_amount(request.amount))?;

        let params = json!({
            "contract": self.contract,
            "from": self.account,
            "to": request.recipient,
            "symbol": request.symbol,
            "quantity": format_quantity(request.amount, self.precision),
            "memo": request.memo,
        });

        let result: Option<serde_json::Value> = self.rpc.call_optional("transfer", params).await?;

        let id = result.as_ref().and_then(|r| {
            r.get("id")
                .or_else(|| r.get("transactionId"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        });

        Ok(TransferReceipt { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRpc;
    use crate::transfer::transfer_if_funded;
    use serde_json::Value;
    use std::time::Duration;

    fn executor(url: &str) -> GatewayExecutor {
        let rpc = RpcClient::new(url, Duration::from_secs(5)).unwrap();
        GatewayExecutor::new(rpc, "peakecoin", "tokens", 3)
    }

    async fn send(url: &str, request: &TransferRequest) -> bool {
        transfer_if_funded(&executor(url), "peakecoin", request).await
    }

    fn request(amount: f64) -> TransferRequest {
        TransferRequest {
            recipient: "alice".into(),
            amount,
            symbol: "PEK".into(),
            memo: "Thanks for participating!".into(),
        }
    }

    fn gateway(balance: &'static str) -> impl Fn(&str, &Value) -> Value + Send + Sync + 'static {
        move |method, _| match method {
            "find" => json!({"jsonrpc": "2.0", "id": 1, "result": [
                {"account": "peakecoin", "symbol": "PEK", "balance": balance}
            ]}),
            "transfer" => json!({"jsonrpc": "2.0", "id": 2, "result": {"id": "tx-1"}}),
            _ => json!({"jsonrpc": "2.0", "id": 0, "error": {"message": "unknown"}}),
        }
    }

    #[tokio::test]
    async fn test_insufficient_balance_issues_no_transfer() {
        let mock = MockRpc::start(gateway("0.500")).await;

        assert!(!send(&mock.url(), &request(1.0)).await);
        assert_eq!(mock.methods(), vec!["find"]);
    }

    #[tokio::test]
    async fn test_funded_transfer_succeeds() {
        let mock = MockRpc::start(gateway("100.000")).await;

        assert!(send(&mock.url(), &request(2.5)).await);
        assert_eq!(mock.methods(), vec!["find", "transfer"]);

        let calls = mock.calls();
        let find = &calls[0].1;
        assert_eq!(find["table"], "balances");
        assert_eq!(find["query"]["account"], "peakecoin");
        assert_eq!(find["query"]["symbol"], "PEK");

        let transfer = &calls[1].1;
        assert_eq!(transfer["from"], "peakecoin");
        assert_eq!(transfer["to"], "alice");
        assert_eq!(transfer["quantity"], "2.500");
        assert_eq!(transfer["memo"], "Thanks for participating!");
    }

    #[tokio::test]
    async fn test_transfer_without_result_still_succeeds() {
        let mock = MockRpc::start(|method, params| match method {
            "transfer" => json!({"jsonrpc": "2.0", "id": 2}),
            _ => gateway("5")(method, params),
        })
        .await;

        assert!(send(&mock.url(), &request(1.0)).await);
    }

    #[tokio::test]
    async fn test_rpc_error_field_means_false() {
        let mock = MockRpc::start(|method, params| match method {
            "transfer" => json!({"jsonrpc": "2.0", "id": 2, "error": {"code": -1, "message": "overdrawn"}}),
            _ => gateway("5")(method, params),
        })
        .await;

        assert!(!send(&mock.url(), &request(1.0)).await);
        assert_eq!(mock.methods(), vec!["find", "transfer"]);
    }

    #[tokio::test]
    async fn test_http_error_means_false() {
        let mock = MockRpc::start_with_status(500, gateway("5")).await;

        assert!(!send(&mock.url(), &request(1.0)).await);
        assert_eq!(mock.methods(), vec!["find"]);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_means_false() {
        assert!(!send("http://127.0.0.1:1/", &request(1.0)).await);
    }

    #[tokio::test]
    async fn test_missing_balance_row_is_zero() {
        let mock = MockRpc::start(|_, _| json!({"jsonrpc": "2.0", "id": 1, "result": []})).await;

        assert_eq!(executor(&mock.url()).quote_balance("nobody", "PEK").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_numeric_balance_row_is_accepted() {
        let mock = MockRpc::start(|method, _| match method {
            "find" => json!({"jsonrpc": "2.0", "id": 1, "result": [{"balance": 100.0}]}),
            _ => json!({"jsonrpc": "2.0", "id": 2, "result": {"id": "tx-1"}}),
        })
        .await;

        assert_eq!(executor(&mock.url()).quote_balance("peakecoin", "PEK").await.unwrap(), 100.0);
        assert!(send(&mock.url(), &request(1.0)).await);
        assert_eq!(mock.methods(), vec!["find", "find", "transfer"]);
    }

    #[tokio::test]
    async fn test_unparseable_balance_means_false() {
        let mock = MockRpc::start(|_, _| json!({"jsonrpc": "2.0", "id": 1, "result": [{"balance": null}]})).await;

        assert!(!send(&mock.url(), &request(1.0)).await);
        assert_eq!(mock.methods(), vec!["find"]);
    }

    #[tokio::test]
    async fn test_balance_covering_rounded_quantity_is_enough() {
        let mock = MockRpc::start(gateway("1.000")).await;

        assert!(send(&mock.url(), &request(1.0004)).await);
        assert_eq!(mock.methods(), vec!["find", "transfer"]);
        assert_eq!(mock.calls()[1].1["quantity"], "1.000");
    }

    #[tokio::test]
    async fn test_amount_rounding_to_zero_is_refused() {
        let mock = MockRpc::start(gateway("5")).await;

        assert!(!send(&mock.url(), &request(0.0004)).await);
        assert_eq!(mock.methods(), vec!["find"]);
    }
}
