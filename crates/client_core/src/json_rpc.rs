//! Wallet provider speaking EIP-1193 method names over HTTP JSON-RPC, as exposed
//! by desktop wallets on a local port. Signing stays inside the wallet.

use std::{sync::Arc, sync::OnceLock, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers_core::types::{Address, TransactionRequest, H256};
use ethers_providers::{Http, Middleware, PendingTransaction, Provider, ProviderError, RpcError};
use shared::domain::{Account, TxHash};
use thiserror::Error;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info};
use url::Url;

use crate::{ContractCall, PendingTip, TipReceipt, TipSigner, WalletProvider};

#[derive(Debug, Error)]
pub enum WalletRpcError {
    #[error("{message}")]
    Remote { code: i64, message: String },
    #[error("wallet provider error: {0}")]
    Provider(ProviderError),
    #[error("wallet has no unlocked account")]
    NoAccounts,
    #[error("wallet returned malformed account {0}")]
    Account(String),
    #[error("transaction {0} was dropped before confirmation")]
    Dropped(String),
    #[error("transaction {0} reverted")]
    Reverted(String),
}

impl From<ProviderError> for WalletRpcError {
    fn from(err: ProviderError) -> Self {
        match err.as_error_response() {
            Some(response) => WalletRpcError::Remote {
                code: response.code,
                message: response.message.clone(),
            },
            None => WalletRpcError::Provider(err),
        }
    }
}

pub struct JsonRpcWallet {
    provider: Provider<Http>,
    accounts_tx: broadcast::Sender<Vec<String>>,
    poll_interval: Duration,
    account_poller: OnceLock<JoinHandle<()>>,
}

impl JsonRpcWallet {
    /// Creates the provider and starts polling `eth_accounts` so account
    /// switches in the wallet reach subscribers. Requires a Tokio runtime.
    pub fn new(url: Url, poll_interval: Duration) -> Arc<Self> {
        let provider = Provider::new(Http::new(url)).interval(poll_interval);
        let (accounts_tx, _) = broadcast::channel(16);
        let wallet = Arc::new(Self {
            provider,
            accounts_tx,
            poll_interval,
            account_poller: OnceLock::new(),
        });

        let poller = spawn_account_poller(
            wallet.provider.clone(),
            wallet.accounts_tx.clone(),
            poll_interval,
        );
        let _ = wallet.account_poller.set(poller);
        wallet
    }
}

impl Drop for JsonRpcWallet {
    fn drop(&mut self) {
        if let Some(poller) = self.account_poller.get() {
            poller.abort();
        }
    }
}

async fn accounts(provider: &Provider<Http>, method: &str) -> Result<Vec<String>, WalletRpcError> {
    Ok(provider.request(method, ()).await?)
}

fn spawn_account_poller(
    provider: Provider<Http>,
    accounts_tx: broadcast::Sender<Vec<String>>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_seen: Option<Vec<String>> = None;
        loop {
            match accounts(&provider, "eth_accounts").await {
                Ok(accounts) => {
                    let changed = last_seen
                        .as_ref()
                        .is_some_and(|previous| previous != &accounts);
                    if changed {
                        info!(count = accounts.len(), "wallet accounts changed");
                        let _ = accounts_tx.send(accounts.clone());
                    }
                    last_seen = Some(accounts);
                }
                Err(err) => debug!(error = %err, "eth_accounts poll failed"),
            }
            tokio::time::sleep(poll_interval).await;
        }
    })
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>> {
        Ok(accounts(&self.provider, "eth_requestAccounts").await?)
    }

    fn subscribe_accounts_changed(&self) -> broadcast::Receiver<Vec<String>> {
        self.accounts_tx.subscribe()
    }

    async fn get_signer(&self) -> Result<Arc<dyn TipSigner>> {
        let from = accounts(&self.provider, "eth_accounts")
            .await?
            .into_iter()
            .next()
            .ok_or(WalletRpcError::NoAccounts)?;
        Ok(Arc::new(JsonRpcSigner {
            provider: self.provider.clone(),
            from: Account::new(from),
        }))
    }

    async fn wait_for_confirmation(&self, tx_hash: &TxHash) -> Result<TipReceipt> {
        let hash: H256 = tx_hash
            .as_str()
            .parse()
            .map_err(|err| anyhow!("invalid transaction hash {tx_hash}: {err}"))?;

        let receipt = PendingTransaction::new(hash, &self.provider)
            .interval(self.poll_interval)
            .confirmations(1)
            .await
            .map_err(WalletRpcError::from)?
            .ok_or_else(|| WalletRpcError::Dropped(tx_hash.to_string()))?;

        let confirmed = format!("{:#x}", receipt.transaction_hash);
        if receipt.status.is_some_and(|status| status.is_zero()) {
            return Err(WalletRpcError::Reverted(confirmed).into());
        }
        Ok(TipReceipt {
            tx_hash: TxHash::new(confirmed),
            block_number: receipt.block_number.map(|n| n.as_u64()),
        })
    }
}

struct JsonRpcSigner {
    provider: Provider<Http>,
    from: Account,
}

#[async_trait]
impl TipSigner for JsonRpcSigner {
    async fn call(&self, call: ContractCall) -> Result<PendingTip> {
        debug!(from = %self.from, method = %call.method, "eth_sendTransaction");
        let from: Address = self
            .from
            .as_str()
            .parse()
            .map_err(|_| WalletRpcError::Account(self.from.to_string()))?;
        let tx = TransactionRequest::new()
            .from(from)
            .to(call.contract)
            .value(call.value)
            .data(call.calldata);

        let pending = self
            .provider
            .send_transaction(tx, None)
            .await
            .map_err(WalletRpcError::from)?;
        Ok(PendingTip {
            hash: TxHash::new(format!("{:#x}", *pending)),
        })
    }
}

#[cfg(test)]
#[path = "tests/json_rpc_tests.rs"]
mod tests;
