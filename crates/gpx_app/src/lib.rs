//! GPX Tools application: command line configuration, effect runner and the
//! single-threaded app loop that drives `gpx_core` with `gpx_engine`.
pub mod app;
pub mod config;
pub mod effects;
pub mod ui;

pub use app::{run, FlowOutcome, RunReport};
pub use config::{AppConfig, Cli, LogTarget};
