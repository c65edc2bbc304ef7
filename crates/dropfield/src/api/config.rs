use serde::Deserialize;

use crate::api::error::{validate_pdr, FieldError};

/// Timing and wiring constants for a field. Every field can be overridden
/// from a JSON document; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// How long a rendered element stays on the field (default: 1500 ms).
    pub display_duration_ms: f64,
    /// Period of the drop consumer (default: 200 ms).
    pub drop_period_ms: f64,
    /// Upper spread of the ambient spawn delay at pdr = 0 (default: 500 ms).
    pub max_spawn_delay_ms: f64,
    /// Floor of the ambient spawn delay (default: 100 ms).
    pub base_spawn_delay_ms: f64,
    /// WebSocket endpoint of the simulation server.
    pub server_url: String,
    /// Glyph for a delivered drop.
    pub drop_symbol: String,
    /// Glyph for an exploded drop.
    pub explosion_symbol: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            display_duration_ms: 1500.0,
            drop_period_ms: 200.0,
            max_spawn_delay_ms: 500.0,
            base_spawn_delay_ms: 100.0,
            server_url: "ws://localhost:8464".to_string(),
            drop_symbol: "🥯".to_string(),
            explosion_symbol: "💥".to_string(),
        }
    }
}

impl FieldConfig {
    /// Parse config overrides from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FieldError> {
        let config: FieldConfig =
            serde_json::from_str(json).map_err(|e| FieldError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), FieldError> {
        let timings = [
            ("display_duration_ms", self.display_duration_ms),
            ("drop_period_ms", self.drop_period_ms),
            ("max_spawn_delay_ms", self.max_spawn_delay_ms),
            ("base_spawn_delay_ms", self.base_spawn_delay_ms),
        ];
        for (name, value) in timings {
            if !value.is_finite() || value < 0.0 {
                return Err(FieldError::InvalidConfig(format!("{name} must be >= 0, got {value}")));
            }
        }
        if self.drop_period_ms == 0.0 {
            return Err(FieldError::InvalidConfig("drop_period_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Glyph for a drop event.
    pub fn drop_glyph(&self, exploded: bool) -> &str {
        if exploded {
            &self.explosion_symbol
        } else {
            &self.drop_symbol
        }
    }
}

/// Values handed over by the hosting page at load time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootParams {
    pub client_id: u64,
    pub initial_pdr: f64,
}

impl BootParams {
    /// Parse the raw `data-id` / `data-pdr` attribute strings.
    pub fn parse(client_id: &str, initial_pdr: &str) -> Result<Self, FieldError> {
        let client_id = client_id
            .trim()
            .parse::<u64>()
            .map_err(|e| FieldError::InvalidBoot(format!("client id {client_id:?}: {e}")))?;
        let pdr = initial_pdr
            .trim()
            .parse::<f64>()
            .map_err(|e| FieldError::InvalidBoot(format!("pdr {initial_pdr:?}: {e}")))?;
        let initial_pdr =
            validate_pdr(pdr).map_err(|e| FieldError::InvalidBoot(e.to_string()))?;
        Ok(Self { client_id, initial_pdr })
    }
}
