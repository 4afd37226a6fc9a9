// Library surface for the binary and for headless integration tests.
pub mod app_dirs;
pub mod config;
pub mod content;
pub mod controller;
pub mod error;
pub mod history;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod terminal;
pub mod ui;

pub use error::{Error, Result};
pub use metrics::Metrics;
pub use session::Session;
