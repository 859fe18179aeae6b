//! Harness configuration: DUT parameters and run parameters, loadable from
//! TOML. Every field has a default, so an empty document is a valid config.

use std::ops::RangeInclusive;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::value::Width;

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub dut: DutParams,
    pub run: RunParams,
}

/// Parameters shared by the DUT and the golden model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DutParams {
    /// Queue depth is `2^addr_width`.
    pub addr_width: u32,
    pub data_width: u32,
    /// Number of arbiter sources.
    pub sources: usize,
}

impl Default for DutParams {
    fn default() -> Self {
        Self {
            addr_width: 4,
            data_width: 32,
            sources: 2,
        }
    }
}

impl DutParams {
    pub fn depth(&self) -> usize {
        1usize << self.addr_width
    }

    pub fn width(&self) -> Result<Width, ConfigError> {
        Width::new(self.data_width).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "dut.data_width must be 1..={}, got {}",
                Width::MAX,
                self.data_width
            ))
        })
    }
}

/// Inclusive `min..=max` range as written in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn range(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunParams {
    pub seed: u64,
    /// Accepted-word target of the plain queue benches.
    pub events: u64,
    /// Packet target: transactions for the commit queue, packets per source
    /// for the arbiter.
    pub packets: u64,
    pub packet_size: Bounds,
    /// Idle cycles between packets of one arbiter source.
    pub gap: Bounds,
    pub valid_probability: f64,
    pub ready_probability: f64,
    pub reset_cycles: u32,
    pub drain_settle_cycles: u32,
    /// Cycles the DUT gets to go idle after stimulus stopped.
    pub drain_timeout: u64,
    /// Hard limit on stimulus-phase cycles.
    pub max_cycles: u64,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            seed: 1,
            events: 10_000,
            packets: 1_000,
            packet_size: Bounds::new(1, 32),
            gap: Bounds::new(0, 32),
            valid_probability: 0.5,
            ready_probability: 0.5,
            reset_cycles: 10,
            drain_settle_cycles: 2,
            drain_timeout: 100_000,
            max_cycles: 10_000_000,
        }
    }
}

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<HarnessConfig, ConfigError> {
    let config: HarnessConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));
        self.dut.width()?;
        if self.dut.addr_width == 0 || self.dut.addr_width > 24 {
            return invalid(format!(
                "dut.addr_width must be 1..=24, got {}",
                self.dut.addr_width
            ));
        }
        if self.dut.sources == 0 {
            return invalid("dut.sources must be at least 1".to_string());
        }
        let run = &self.run;
        if run.packet_size.min == 0 || run.packet_size.min > run.packet_size.max {
            return invalid(format!(
                "run.packet_size must satisfy 1 <= min <= max, got {}..={}",
                run.packet_size.min, run.packet_size.max
            ));
        }
        if run.gap.min > run.gap.max {
            return invalid(format!(
                "run.gap must satisfy min <= max, got {}..={}",
                run.gap.min, run.gap.max
            ));
        }
        for (name, p) in [
            ("valid_probability", run.valid_probability),
            ("ready_probability", run.ready_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("run.{name} must be within [0, 1], got {p}"));
            }
        }
        Ok(())
    }
}
