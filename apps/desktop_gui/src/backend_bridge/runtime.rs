//! Worker thread running the Tokio runtime, the wallet provider and the tip client.

use std::{sync::Arc, thread};

use client_core::{
    JsonRpcWallet, TipClient, TipClientEvent, TipDraft, TipSettings, WalletProvider,
};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: TipSettings) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build backend runtime: {err}");
                let _ = ui_tx.try_send(UiEvent::Error(format!(
                    "backend worker startup failure: {err}"
                )));
                return;
            }
        };

        runtime.block_on(async move {
            let wallet: Arc<dyn WalletProvider> = JsonRpcWallet::new(
                settings.wallet_rpc_url.clone(),
                settings.account_poll_interval,
            );
            let client = match TipClient::new(Some(wallet), settings) {
                Ok(client) => client,
                Err(err) => {
                    tracing::error!(error = %err, "tip client startup failed");
                    let _ = ui_tx.try_send(UiEvent::Error(err.to_string()));
                    return;
                }
            };
            let _ = ui_tx.try_send(UiEvent::Ready {
                contract_address: client.contract_address(),
            });

            let mut events = client.subscribe_events();
            let events_tx = ui_tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let evt = match event {
                        TipClientEvent::StateChanged(snapshot) => UiEvent::StateChanged(snapshot),
                        TipClientEvent::Prompt(prompt) => UiEvent::Prompt(prompt.to_string()),
                    };
                    let _ = events_tx.try_send(evt);
                }
            });

            // Commands run as tasks so a pending confirmation never blocks the queue.
            while let Ok(cmd) = cmd_rx.recv() {
                let client = Arc::clone(&client);
                match cmd {
                    BackendCommand::Connect => {
                        tokio::spawn(async move {
                            let _ = client.connect().await;
                        });
                    }
                    BackendCommand::SendTip { message, amount } => {
                        tokio::spawn(async move {
                            let _ = client.send_tip_with(TipDraft { message, amount }).await;
                        });
                    }
                }
            }
            forwarder.abort();
        });
    });
}
