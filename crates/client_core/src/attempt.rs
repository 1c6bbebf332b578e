use chrono::{DateTime, Utc};
use shared::domain::TxHash;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TxStatus {
    #[default]
    Idle,
    Sending,
    WaitingConfirmation,
    Confirmed,
    Failed(String),
}

impl TxStatus {
    fn stage(&self) -> u8 {
        match self {
            TxStatus::Idle => 0,
            TxStatus::Sending => 1,
            TxStatus::WaitingConfirmation => 2,
            TxStatus::Confirmed => 3,
            TxStatus::Failed(_) => 4,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, TxStatus::Sending | TxStatus::WaitingConfirmation)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal tip status transition from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: TxStatus,
    pub to: TxStatus,
}

/// One tip submission. Status only moves forward one step at a time, or jumps
/// to `Failed` while in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAttempt {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    status: TxStatus,
    tx_hash: Option<TxHash>,
}

impl TransactionAttempt {
    pub fn begin() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            status: TxStatus::Sending,
            tx_hash: None,
        }
    }

    pub fn status(&self) -> &TxStatus {
        &self.status
    }

    pub fn tx_hash(&self) -> Option<&TxHash> {
        self.tx_hash.as_ref()
    }

    pub fn advance(&mut self, next: TxStatus) -> Result<(), TransitionError> {
        let allowed = match &next {
            TxStatus::Failed(_) => self.status.is_in_flight(),
            TxStatus::Idle => false,
            _ => !self.status.is_settled() && next.stage() == self.status.stage() + 1,
        };
        if !allowed {
            return Err(TransitionError {
                from: self.status.clone(),
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Stores the pending transaction hash and moves to `WaitingConfirmation`.
    pub fn accept(&mut self, tx_hash: TxHash) -> Result<(), TransitionError> {
        self.advance(TxStatus::WaitingConfirmation)?;
        self.tx_hash = Some(tx_hash);
        Ok(())
    }
}
