use client_core::{TipClientSnapshot, TipSettings};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{just_confirmed, TxLink, UiEvent},
    orchestration::dispatch_backend_command,
};

pub struct TipJarApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    explorer_tx_base: String,
    contract_address: Option<String>,
    message: String,
    amount: String,
    snapshot: TipClientSnapshot,
    status: String,
    prompt: Option<String>,
}

impl TipJarApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        settings: &TipSettings,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            explorer_tx_base: settings.explorer_tx_base.clone(),
            contract_address: None,
            message: String::new(),
            amount: settings.default_amount.clone(),
            snapshot: TipClientSnapshot::default(),
            status: "Starting wallet bridge...".to_string(),
            prompt: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Ready { contract_address } => {
                    self.contract_address = Some(contract_address);
                    self.status.clear();
                }
                UiEvent::StateChanged(snapshot) => {
                    if just_confirmed(&self.snapshot, &snapshot) {
                        self.message.clear();
                    }
                    self.status = snapshot.status_text.clone();
                    self.snapshot = snapshot;
                }
                UiEvent::Prompt(text) => self.prompt = Some(text),
                UiEvent::Error(text) => self.status = format!("Error: {text}"),
            }
        }
    }

    fn show_tip_form(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("TipJar");
            if let Some(contract) = &self.contract_address {
                ui.horizontal(|ui| {
                    ui.label("Contract:");
                    ui.monospace(contract);
                });
            }
            ui.separator();

            match &self.snapshot.wallet.account {
                Some(account) => {
                    ui.label(format!("Connected: {}", account.abbreviated()));
                }
                None => {
                    if ui.button("Connect Wallet").clicked() {
                        dispatch_backend_command(
                            &self.cmd_tx,
                            BackendCommand::Connect,
                            &mut self.status,
                        );
                    }
                }
            }

            ui.add_space(8.0);
            ui.label("Message");
            ui.add(egui::TextEdit::singleline(&mut self.message).hint_text("Thanks!"));
            ui.label("Amount (ETH)");
            ui.add(egui::TextEdit::singleline(&mut self.amount).hint_text("0.000001"));

            let in_flight = self.snapshot.status().is_in_flight();
            if ui
                .add_enabled(!in_flight, egui::Button::new("Send Tip"))
                .clicked()
            {
                dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::SendTip {
                        message: self.message.clone(),
                        amount: self.amount.clone(),
                    },
                    &mut self.status,
                );
            }

            ui.add_space(8.0);
            if !self.status.is_empty() {
                ui.label(&self.status);
            }
            if let Some(link) = TxLink::from_snapshot(&self.snapshot, &self.explorer_tx_base) {
                ui.hyperlink_to(format!("Tx: {}", link.label), link.url);
            }
        });
    }

    fn show_prompt(&mut self, ctx: &egui::Context) {
        let Some(text) = self.prompt.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(text);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.prompt = None;
        }
    }
}

impl eframe::App for TipJarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.show_tip_form(ctx);
        self.show_prompt(ctx);

        if self.snapshot.status().is_in_flight() {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }
}
