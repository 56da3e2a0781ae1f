//! Bridge configuration presets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::wire::WIRE_VERSION;

/// Dispatch strategy used to deliver batches to the UI side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Structured records passed in-process.
    #[default]
    Direct,
    /// Records encoded into versioned binary buffers.
    Serialized,
}

/// Configuration for a render bridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// dp -> px scale applied at the document boundary.
    pub density: f32,
    /// Backend selected for roots attached without an explicit choice.
    pub backend: BackendKind,
    /// Upper bound on the blocking measurement round trip (ms).
    pub measure_timeout_ms: u64,
    /// Version written into, and required from, serialized headers.
    pub wire_version: u32,
    /// Forward only render-relevant style keys on create/update.
    pub style_filter: bool,
    /// Default directive for the tracing subscriber.
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl BridgeConfig {
    /// Standard configuration for general use.
    pub fn standard() -> Self {
        Self {
            density: 1.0,
            backend: BackendKind::Direct,
            measure_timeout_ms: 100,
            wire_version: WIRE_VERSION,
            style_filter: true,
            log_filter: "info".to_string(),
        }
    }

    /// Testing configuration: generous timeout, verbose logging.
    pub fn testing() -> Self {
        Self {
            measure_timeout_ms: 2_000,
            log_filter: "debug".to_string(),
            ..Self::standard()
        }
    }

    /// Parse a TOML document; missing keys take their standard values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: BridgeConfig =
            toml::from_str(source).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(BridgeError::Config(format!(
                "density must be a positive number, got {}",
                self.density
            )));
        }
        if self.measure_timeout_ms == 0 {
            return Err(BridgeError::Config(
                "measure_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn measure_timeout(&self) -> Duration {
        Duration::from_millis(self.measure_timeout_ms)
    }

    /// Set the density factor.
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Set the default backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Set the measurement timeout.
    pub fn with_measure_timeout(mut self, timeout: Duration) -> Self {
        self.measure_timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    /// Set the wire version.
    pub fn with_wire_version(mut self, version: u32) -> Self {
        self.wire_version = version;
        self
    }

    /// Enable or disable the style filter.
    pub fn with_style_filter(mut self, enabled: bool) -> Self {
        self.style_filter = enabled;
        self
    }

    /// Set the default log directive.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.density, 1.0);
        assert_eq!(config.backend, BackendKind::Direct);
        assert_eq!(config.measure_timeout(), Duration::from_millis(100));
        assert_eq!(config.wire_version, 13);
        assert!(config.style_filter);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = BridgeConfig::from_toml_str(
            r#"
            density = 3.0
            backend = "serialized"
            "#,
        )
        .unwrap();
        assert_eq!(config.density, 3.0);
        assert_eq!(config.backend, BackendKind::Serialized);
        assert_eq!(config.measure_timeout_ms, 100);
    }

    #[test]
    fn test_from_toml_rejects_bad_density() {
        let err = BridgeConfig::from_toml_str("density = 0.0").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(BridgeConfig::from_toml_str("backend = \"carrier-pigeon\"").is_err());
    }

    #[test]
    fn test_builders() {
        let config = BridgeConfig::testing()
            .with_density(2.0)
            .with_backend(BackendKind::Serialized)
            .with_measure_timeout(Duration::from_millis(250))
            .with_style_filter(false);
        assert_eq!(config.density, 2.0);
        assert_eq!(config.measure_timeout_ms, 250);
        assert!(!config.style_filter);
        assert_eq!(config.log_filter, "debug");
    }
}
