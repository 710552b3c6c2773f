//! Reward Distribution
//!
//! Turns one `/distribute` trigger into a sequence of transfers.
//!
//! - **Delegators** (native mode): every delegator of the configured account
//!   whose balance is strictly above the minimum receives the reward. The
//!   first failing transfer aborts the rest of the batch.
//! - **Request body** (gateway mode): a single recipient named in the body,
//!   paid only if the account can cover the amount. Transfer failures are
//!   logged, never returned.
//!
//! Runs are serialized: a second trigger waits until the first one is done.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::api::Metrics;
use crate::config::BotConfig;
use crate::transfer::{transfer_if_funded, DelegationSource, TransferError, TransferExecutor};
use crate::types::{DistributeBody, DistributionReport, TransferRequest};

/// Errors surfaced to the `/distribute` caller
#[derive(Debug, thiserror::Error)]
pub enum DistributeError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Failed to load delegations: {0}")]
    Delegations(TransferError),

    #[error("Transfer to {recipient} failed: {source}")]
    Transfer {
        recipient: String,
        #[source]
        source: TransferError,
    },
}

/// Where recipients come from
pub enum RecipientSource {
    Delegators(Arc<dyn DelegationSource>),
    RequestBody,
}

pub struct Distributor {
    config: Arc<BotConfig>,
    executor: Arc<dyn TransferExecutor>,
    source: RecipientSource,
    metrics: Arc<Metrics>,
    run_lock: Mutex<()>,
}

impl Distributor {
    pub fn new(
        config: Arc<BotConfig>,
        executor: Arc<dyn TransferExecutor>,
        source: RecipientSource,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            executor,
            source,
            metrics,
            run_lock: Mutex::new(()),
        }
    }

    /// Handle one trigger. `body` is ignored when paying delegators.
    pub async fn run(&self, body: &[u8]) -> Result<DistributionReport, DistributeError> {
        let _guard = self.run_lock.lock().await;

        let result = match &self.source {
            RecipientSource::Delegators(delegations) => {
                self.pay_delegators(delegations.as_ref()).await
            }
            RecipientSource::RequestBody => {
                let body = parse_body(body)?;
                let amount = body.amount.unwrap_or(self.config.reward_amount);
                self.pay_one(&body.recipient, amount).await
            }
        };

        if let Ok(report) = &result {
            self.metrics.record(report);
        }
        result
    }

    async fn pay_delegators(
        &self,
        delegations: &dyn DelegationSource,
    ) -> Result<DistributionReport, DistributeError> {
        let config = &self.config;
        let recipients = delegations
            .delegators(&config.account_name, &config.token_symbol)
            .await
            .map_err(DistributeError::Delegations)?;

        let mut report = DistributionReport {
            considered: recipients.len(),
            ..Default::default()
        };

        for recipient in recipients {
            if !recipient.qualifies(config.minimum_balance) {
                debug!(
                    "Skipping {}: balance {} not above {}",
                    recipient.account, recipient.balance, config.minimum_balance
                );
                report.skipped += 1;
                continue;
            }

            let request = TransferRequest {
                recipient: recipient.account,
                amount: config.reward_amount,
                symbol: config.token_symbol.clone(),
                memo: config.memo.clone(),
            };

            if let Err(source) = self.executor.execute_transfer(&request).await {
                report.failed += 1;
                self.metrics.record(&report);
                return Err(DistributeError::Transfer {
                    recipient: request.recipient,
                    source,
                });
            }
            report.sent += 1;
        }

        info!(
            "💸 Distribution done: {} delegators, {} paid, {} skipped",
            report.considered, report.sent, report.skipped
        );
        Ok(report)
    }

    async fn pay_one(&self, recipient: &str, amount: f64) -> Result<DistributionReport, DistributeError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(DistributeError::InvalidAmount(amount));
        }

        let request = TransferRequest {
            recipient: recipient.to_string(),
            amount,
            symbol: self.config.token_symbol.clone(),
            memo: self.config.memo.clone(),
        };

        let mut report = DistributionReport {
            considered: 1,
            ..Default::default()
        };

        if transfer_if_funded(self.executor.as_ref(), &self.config.account_name, &request).await {
            report.sent = 1;
        } else {
            report.failed = 1;
        }

        info!(
            "💸 Reward to {}: {}",
            recipient,
            if report.sent == 1 { "sent" } else { "not sent" }
        );
        Ok(report)
    }
}

fn parse_body(body: &[u8]) -> Result<DistributeBody, DistributeError> {
    let body: DistributeBody =
        serde_json::from_slice(body).map_err(|e| DistributeError::InvalidBody(e.to_string()))?;

    if body.recipient.trim().is_empty() {
        return Err(DistributeError::InvalidBody("recipient must not be empty".to_string()));
    }
    Ok(body)
}
