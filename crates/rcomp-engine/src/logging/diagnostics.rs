use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

/// Rate limits for renderer diagnostics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Engine failures are reported on the 1st, (N+1)th, (2N+1)th... occurrence.
    pub failure_log_interval: u32,
    /// Unsupported-feature reports stop after this many per feature.
    pub unsupported_log_limit: u32,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            failure_log_interval: 100,
            unsupported_log_limit: 10,
        }
    }
}

/// Destination for diagnostic lines.
pub trait DiagnosticsSink: Send {
    fn emit(&mut self, level: log::Level, message: &str);
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn emit(&mut self, level: log::Level, message: &str) {
        log::log!(target: "rcomp_engine::diagnostics", level, "{message}");
    }
}

/// Counts engine failures and unsupported-feature hits, emitting a
/// bounded number of messages.
///
/// Counters are per renderer instance; they are never reset.
pub struct Diagnostics {
    config: DiagnosticsConfig,
    sink: Box<dyn DiagnosticsSink>,
    engine_failures: u64,
    unsupported: HashMap<String, u64>,
    emitted: u64,
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("config", &self.config)
            .field("engine_failures", &self.engine_failures)
            .field("unsupported", &self.unsupported)
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

impl Diagnostics {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self::with_sink(config, Box::new(LogSink))
    }

    pub fn with_sink(config: DiagnosticsConfig, sink: Box<dyn DiagnosticsSink>) -> Self {
        Self {
            config,
            sink,
            engine_failures: 0,
            unsupported: HashMap::new(),
            emitted: 0,
        }
    }

    /// Records a failed engine call. Returns `true` if a message was emitted.
    pub fn engine_failure(&mut self, context: &str, err: &EngineError) -> bool {
        self.engine_failures += 1;
        let interval = u64::from(self.config.failure_log_interval.max(1));
        if (self.engine_failures - 1) % interval != 0 {
            return false;
        }

        let message = format!(
            "{context} failed: {err} (failure #{})",
            self.engine_failures
        );
        self.emit(log::Level::Error, &message);
        true
    }

    /// Records use of an unsupported feature. Returns `true` if a message was emitted.
    pub fn unsupported(&mut self, feature: &str) -> bool {
        let count = self.unsupported.entry(feature.to_owned()).or_default();
        *count += 1;
        if *count > u64::from(self.config.unsupported_log_limit) {
            return false;
        }

        let message = format!("unsupported feature: {feature}");
        self.emit(log::Level::Warn, &message);
        true
    }

    pub fn engine_failures(&self) -> u64 {
        self.engine_failures
    }

    pub fn unsupported_count(&self, feature: &str) -> u64 {
        self.unsupported.get(feature).copied().unwrap_or(0)
    }

    pub fn unsupported_total(&self) -> u64 {
        self.unsupported.values().sum()
    }

    /// Number of messages handed to the sink.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn config(&self) -> DiagnosticsConfig {
        self.config
    }

    fn emit(&mut self, level: log::Level, message: &str) {
        self.emitted += 1;
        self.sink.emit(level, message);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DiagnosticsConfig::default())
    }
}
