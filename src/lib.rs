//! Export WeatherXM station history to JSON files.
//!
//! This crate implements a single-pass export:
//! log in, resolve the account, list its stations, fetch each station's
//! trailing seven days of readings, then write one `<station_id>.json` per station.
//!
//! ## Quick start
//! - Optionally point at another API or output directory via environment variables
//!   (`WXM_API_URL`, `WXM_OUTPUT_DIR`) or a `.wxmrc` file (current directory or home).
//! - Build a [`RunContext`] and call [`run`] with the account credentials.
//!
//! ```no_run
//! use anyhow::Result;
//! use chrono::Local;
//! use wxm_export::{Client, Credentials, ExportConfig, RunContext, run};
//!
//! fn main() -> Result<()> {
//!     let config = ExportConfig::from_env()?;
//!     let client = Client::new(&config)?;
//!     let ctx = RunContext::new(&client, &config, Local::now().date_naive());
//!     let credentials = Credentials::new("someone@example.com", "hunter2");
//!     let summary = run(&ctx, &credentials)?;
//!     println!("wrote {} file(s)", summary.files.len());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod export;
mod models;
pub mod prompt;
mod util;
mod window;

pub use client::Client;
pub use config::ExportConfig;
pub use error::{ApiError, ExportError, WriteError};
pub use export::{ExportSummary, RunContext, run, write_stations};
pub use models::{Credentials, Session, Station};
pub use window::HistoryWindow;
