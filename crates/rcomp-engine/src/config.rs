use serde::{Deserialize, Serialize};

use crate::engine::MAX_QUADS;
use crate::logging::DiagnosticsConfig;

/// Renderer construction options.
///
/// Deserializes from partial documents; missing fields take defaults.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Wait for vertical blank before presenting.
    pub vsync: bool,
    /// Quads per composite call; clamped to `1..=MAX_QUADS`.
    pub max_quads: usize,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            vsync: false,
            max_quads: MAX_QUADS,
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl RendererConfig {
    #[inline]
    pub fn effective_max_quads(&self) -> usize {
        self.max_quads.clamp(1, MAX_QUADS)
    }
}
