//! Events flowing from the backend worker to the UI.

use client_core::{TipClientSnapshot, TxStatus};

pub enum UiEvent {
    Ready { contract_address: String },
    StateChanged(TipClientSnapshot),
    Prompt(String),
    Error(String),
}

/// Explorer link for the transaction of the current attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxLink {
    pub label: String,
    pub url: String,
}

impl TxLink {
    pub fn from_snapshot(snapshot: &TipClientSnapshot, explorer_tx_base: &str) -> Option<Self> {
        snapshot.tx_hash().map(|hash| Self {
            label: hash.abbreviated(),
            url: hash.explorer_url(explorer_tx_base),
        })
    }
}

/// True when `next` is the first snapshot to report a confirmed tip.
pub fn just_confirmed(previous: &TipClientSnapshot, next: &TipClientSnapshot) -> bool {
    next.status() == TxStatus::Confirmed
        && (previous.status() != TxStatus::Confirmed
            || previous.attempt.as_ref().map(|a| a.id) != next.attempt.as_ref().map(|a| a.id))
}
