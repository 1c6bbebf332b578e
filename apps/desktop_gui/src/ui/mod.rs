//! UI layer for the desktop tip jar.

pub mod app;

pub use app::TipJarApp;
