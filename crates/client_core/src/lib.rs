use std::sync::{Arc, OnceLock, Weak};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::{Account, TxHash};
use thiserror::Error;
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;

pub mod amount;
pub mod attempt;
pub mod contract;
pub mod json_rpc;
pub mod settings;

pub use amount::{validate_tip_amount, AmountError, TipAmount};
pub use attempt::{TransactionAttempt, TransitionError, TxStatus};
pub use contract::{ContractCall, ContractError, TipJarContract};
pub use json_rpc::JsonRpcWallet;
pub use settings::TipSettings;

pub const STATUS_SENDING: &str = "Sending transaction...";
pub const STATUS_WAITING: &str = "Waiting for confirmation...";
pub const STATUS_CONFIRMED: &str = "Tip sent ✅ (tx confirmed)";

/// Wallet capabilities the controller depends on. Implementations own the
/// account-change event stream; the controller only subscribes to it.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<String>>;
    fn subscribe_accounts_changed(&self) -> broadcast::Receiver<Vec<String>>;
    async fn get_signer(&self) -> Result<Arc<dyn TipSigner>>;
    async fn wait_for_confirmation(&self, tx_hash: &TxHash) -> Result<TipReceipt>;
}

#[async_trait]
pub trait TipSigner: Send + Sync {
    /// Submits the call and resolves once the network has accepted it.
    async fn call(&self, call: ContractCall) -> Result<PendingTip>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTip {
    pub hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Problems surfaced as a blocking prompt instead of the status line. None of
/// them reach the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("Please install MetaMask.")]
    ProviderMissing,
    #[error("Connect your wallet first.")]
    NotConnected,
    #[error("Enter a positive tip amount.")]
    InvalidAmount(#[source] AmountError),
    #[error("A tip is already in flight; wait for it to settle.")]
    TipInFlight,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletConnection {
    pub account: Option<Account>,
}

impl WalletConnection {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipDraft {
    pub message: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipClientSnapshot {
    pub wallet: WalletConnection,
    pub draft: TipDraft,
    pub attempt: Option<TransactionAttempt>,
    pub status_text: String,
}

impl TipClientSnapshot {
    pub fn status(&self) -> TxStatus {
        self.attempt
            .as_ref()
            .map(|attempt| attempt.status().clone())
            .unwrap_or_default()
    }

    pub fn tx_hash(&self) -> Option<&TxHash> {
        self.attempt.as_ref().and_then(TransactionAttempt::tx_hash)
    }
}

#[derive(Debug, Clone)]
pub enum TipClientEvent {
    StateChanged(TipClientSnapshot),
    Prompt(PromptError),
}

pub struct TipClient {
    provider: Option<Arc<dyn WalletProvider>>,
    contract: TipJarContract,
    settings: TipSettings,
    inner: Mutex<TipClientSnapshot>,
    events: broadcast::Sender<TipClientEvent>,
    account_listener: OnceLock<JoinHandle<()>>,
}

struct StartedTip {
    provider: Arc<dyn WalletProvider>,
    attempt_id: Uuid,
    message: String,
    amount: TipAmount,
}

impl TipClient {
    /// Builds the controller and subscribes to the provider's account changes.
    /// Must be called from within a Tokio runtime when a provider is given.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        settings: TipSettings,
    ) -> Result<Arc<Self>, ContractError> {
        let contract = TipJarContract::new(&settings.contract_address)?;
        let (events, _) = broadcast::channel(256);

        let client = Arc::new(Self {
            provider,
            contract,
            settings,
            inner: Mutex::new(TipClientSnapshot::default()),
            events,
            account_listener: OnceLock::new(),
        });

        if let Some(provider) = &client.provider {
            let listener = spawn_account_listener(
                provider.subscribe_accounts_changed(),
                Arc::downgrade(&client),
            );
            let _ = client.account_listener.set(listener);
        }
        Ok(client)
    }

    pub fn settings(&self) -> &TipSettings {
        &self.settings
    }

    pub fn contract_address(&self) -> String {
        format!("{:#x}", self.contract.address())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TipClientEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> TipClientSnapshot {
        self.inner.lock().await.clone()
    }

    pub async fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| state.draft.message = message).await;
    }

    pub async fn set_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.update(|state| state.draft.amount = amount).await;
    }

    pub async fn connect(&self) -> Result<(), PromptError> {
        let Some(provider) = self.provider.clone() else {
            return Err(self.prompt(PromptError::ProviderMissing));
        };

        let outcome = provider
            .request_accounts()
            .await
            .and_then(|accounts| {
                first_account(&accounts).ok_or_else(|| anyhow!("no accounts returned"))
            });

        match outcome {
            Ok(account) => {
                info!(account = %account, "wallet connected");
                self.update(|state| {
                    state.status_text = format!("Wallet connected: {}", account.abbreviated());
                    state.wallet.account = Some(account);
                })
                .await;
            }
            Err(err) => {
                warn!(error = %err, "wallet connect failed");
                self.update(|state| state.status_text = format!("Connect error: {err}"))
                    .await;
            }
        }
        Ok(())
    }

    pub async fn handle_accounts_changed(&self, accounts: Vec<String>) {
        let account = first_account(&accounts);
        info!(
            account = account.as_ref().map(Account::as_str).unwrap_or(""),
            "wallet accounts changed"
        );
        self.update(|state| state.wallet.account = account).await;
    }

    /// Runs one tip submission to completion. External failures end up in the
    /// status line; only precondition failures are returned.
    pub async fn send_tip(&self) -> Result<(), PromptError> {
        self.run_tip(None).await
    }

    /// Stores `draft` and submits it under one lock, so a tip still in flight
    /// keeps the draft it was started with.
    pub async fn send_tip_with(&self, draft: TipDraft) -> Result<(), PromptError> {
        self.run_tip(Some(draft)).await
    }

    async fn run_tip(&self, draft: Option<TipDraft>) -> Result<(), PromptError> {
        let started = {
            let mut guard = self.inner.lock().await;
            let started = self.begin_attempt(&mut guard, draft);
            if started.is_ok() {
                self.publish(guard.clone());
            }
            started
        };
        let StartedTip {
            provider,
            attempt_id,
            message,
            amount,
        } = match started {
            Ok(started) => started,
            Err(prompt) => return Err(self.prompt(prompt)),
        };

        info!(%attempt_id, amount = %amount.ether, "submitting tip");
        if let Err(err) = self
            .submit_tip(provider.as_ref(), attempt_id, &message, &amount)
            .await
        {
            warn!(%attempt_id, error = %err, "tip failed");
            self.fail_attempt(attempt_id, err.to_string()).await;
        }
        Ok(())
    }

    fn begin_attempt(
        &self,
        state: &mut TipClientSnapshot,
        draft: Option<TipDraft>,
    ) -> Result<StartedTip, PromptError> {
        if !state.wallet.is_connected() {
            return Err(PromptError::NotConnected);
        }
        let provider = self
            .provider
            .clone()
            .ok_or(PromptError::ProviderMissing)?;
        if state.status().is_in_flight() {
            return Err(PromptError::TipInFlight);
        }
        if let Some(draft) = draft {
            state.draft = draft;
        }
        let amount = validate_tip_amount(&state.draft.amount, &self.settings.default_amount)
            .map_err(PromptError::InvalidAmount)?;

        let message = if state.draft.message.is_empty() {
            self.settings.fallback_message.clone()
        } else {
            state.draft.message.clone()
        };

        let attempt = TransactionAttempt::begin();
        let attempt_id = attempt.id;
        state.attempt = Some(attempt);
        state.status_text = STATUS_SENDING.to_string();
        Ok(StartedTip {
            provider,
            attempt_id,
            message,
            amount,
        })
    }

    async fn submit_tip(
        &self,
        provider: &dyn WalletProvider,
        attempt_id: Uuid,
        message: &str,
        amount: &TipAmount,
    ) -> Result<()> {
        let signer = provider.get_signer().await?;
        let call = self.contract.tip_call(message, amount.wei)?;
        let pending = signer.call(call).await?;

        info!(%attempt_id, tx_hash = %pending.hash, "tip accepted, waiting for confirmation");
        let hash = pending.hash.clone();
        self.transition(attempt_id, move |state, attempt| {
            attempt.accept(hash)?;
            state.status_text = STATUS_WAITING.to_string();
            Ok(())
        })
        .await?;

        let receipt = provider.wait_for_confirmation(&pending.hash).await?;
        info!(
            %attempt_id,
            tx_hash = %receipt.tx_hash,
            block = receipt.block_number,
            "tip confirmed"
        );
        self.transition(attempt_id, |state, attempt| {
            attempt.advance(TxStatus::Confirmed)?;
            state.status_text = STATUS_CONFIRMED.to_string();
            state.draft.message.clear();
            Ok(())
        })
        .await
    }

    async fn fail_attempt(&self, attempt_id: Uuid, reason: String) {
        let result = self
            .transition(attempt_id, |state, attempt| {
                attempt.advance(TxStatus::Failed(reason.clone()))?;
                state.status_text = format!("Error: {reason}");
                Ok(())
            })
            .await;
        if let Err(err) = result {
            warn!(%attempt_id, error = %err, "could not record tip failure");
        }
    }

    async fn transition(
        &self,
        attempt_id: Uuid,
        apply: impl FnOnce(&mut TipClientSnapshot, &mut TransactionAttempt) -> Result<(), TransitionError>,
    ) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        let mut attempt = match state.attempt.take() {
            Some(attempt) if attempt.id == attempt_id => attempt,
            other => {
                state.attempt = other;
                return Err(anyhow!("tip attempt {attempt_id} is no longer current"));
            }
        };
        let applied = apply(state, &mut attempt);
        state.attempt = Some(attempt);
        applied?;
        // Published under the lock so subscribers see snapshots in mutation order.
        self.publish(state.clone());
        Ok(())
    }

    async fn update(&self, apply: impl FnOnce(&mut TipClientSnapshot)) {
        let mut guard = self.inner.lock().await;
        apply(&mut guard);
        self.publish(guard.clone());
    }

    fn publish(&self, snapshot: TipClientSnapshot) {
        let _ = self.events.send(TipClientEvent::StateChanged(snapshot));
    }

    fn prompt(&self, prompt: PromptError) -> PromptError {
        let _ = self.events.send(TipClientEvent::Prompt(prompt.clone()));
        prompt
    }
}

impl Drop for TipClient {
    fn drop(&mut self) {
        if let Some(listener) = self.account_listener.get() {
            listener.abort();
        }
    }
}

fn first_account(accounts: &[String]) -> Option<Account> {
    accounts.first().map(|account| Account::new(account.clone()))
}

fn spawn_account_listener(
    mut accounts: broadcast::Receiver<Vec<String>>,
    client: Weak<TipClient>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match accounts.recv().await {
                Ok(list) => {
                    let Some(client) = client.upgrade() else {
                        break;
                    };
                    client.handle_accounts_changed(list).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "account change events lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
