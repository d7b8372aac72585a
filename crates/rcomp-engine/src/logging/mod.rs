//! Logging utilities.
//!
//! Logger initialization plus the rate-limited diagnostics the renderer uses
//! for non-fatal engine failures and unsupported features.

mod diagnostics;
mod init;

pub use diagnostics::{Diagnostics, DiagnosticsConfig, DiagnosticsSink, LogSink};
pub use init::{LoggingConfig, init_logging};
