use std::path::Path;

mod backend_bridge;
mod controller;
mod ui;

use client_core::settings::load_tip_settings;
use crossbeam_channel::bounded;
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::TipJarApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_tip_settings(Path::new("."));
    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(cmd_rx, ui_tx, settings.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("TipJar")
            .with_inner_size([420.0, 360.0])
            .with_min_inner_size([360.0, 300.0]),
        ..Default::default()
    };
    eframe::run_native(
        "TipJar",
        options,
        Box::new(move |_cc| Ok(Box::new(TipJarApp::new(cmd_tx, ui_rx, &settings)))),
    )
}
