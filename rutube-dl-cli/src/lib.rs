//! Library side of the `rutube-dl` binary: argument parsing, config
//! loading and the batch driver on top of `vodl-engine`.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod naming;
pub mod progress;

pub use batch::{BatchRunner, BatchSummary};
pub use cli::Args;
pub use config::AppConfig;
pub use error::{AppError, Result};
