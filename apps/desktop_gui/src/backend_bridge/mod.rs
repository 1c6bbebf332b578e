//! Bridge between the egui thread and the Tokio worker that owns the tip client.

pub mod commands;
pub mod runtime;
