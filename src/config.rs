//! Engine configuration

use crate::error::{EngineError, Result};

/// Resource limits applied by the engine.
///
/// The engine itself is a single synchronous script per invocation; these
/// knobs bound how much a single invocation may materialise.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of entries accepted by one `bulk_add` invocation
    pub max_bulk_entries: usize,

    /// Optional cap on the entries a range scan may materialise when the
    /// query carries no LIMIT. `None` leaves the scan bounded only by the
    /// source series size.
    pub max_result_entries: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_bulk_entries: 10_000,
            max_result_entries: None,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_bulk_entries == 0 {
            return Err(EngineError::argument(
                "max_bulk_entries must be greater than zero",
            ));
        }
        if self.max_result_entries == Some(0) {
            return Err(EngineError::argument(
                "max_result_entries must be greater than zero when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_caps_rejected() {
        let config = EngineConfig {
            max_bulk_entries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            max_result_entries: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
