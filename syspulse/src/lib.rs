//! syspulse: terminal client for a SysPulse backend's live metrics stream.

pub mod alerts;
pub mod api;
pub mod app;
pub mod connection;
pub mod history;
pub mod monitor;
pub mod notify;
pub mod processes;
pub mod settings;
pub mod types;
pub mod ui;
pub mod ws;
