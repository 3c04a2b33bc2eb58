use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::deagg::GridBins;
use crate::distance::DistanceMetric;
use crate::error::{Result, RiskError};
use crate::ground_motion::{DEFAULT_SPAWN_BINS, VariabilityMethod};

/// Per-run knobs chosen by the risk driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Seed for the Monte Carlo generator handed to the ground-motion engine.
    pub seed: u64,
    pub distance_metric: DistanceMetric,
    pub variability: VariabilityMethod,
    /// Recurrence models the ground-motion sample is broadcast across.
    pub recurrence_models: usize,
    pub grid_bins: GridBins,
}

impl RiskConfig {
    pub fn canonical() -> Self {
        RiskConfig {
            seed: 42,
            distance_metric: DistanceMetric::Rupture,
            variability: VariabilityMethod::Spawn { bins: DEFAULT_SPAWN_BINS },
            recurrence_models: 1,
            grid_bins: GridBins::from(1),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: RiskConfig =
            serde_json::from_str(json).map_err(|e| RiskError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.recurrence_models == 0 {
            return Err(RiskError::InvalidConfig("recurrence_models must be at least 1".into()));
        }
        if self.grid_bins.lat == 0 || self.grid_bins.lon == 0 {
            return Err(RiskError::InvalidConfig(format!(
                "grid_bins must be positive, got {:?}",
                self.grid_bins
            )));
        }
        Ok(())
    }

    /// A fresh generator for this run. Callers own it and pass it down;
    /// concurrent workers should each take their own.
    pub fn rng(&self) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(self.seed)
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::ground_motion::SigmaOffset;

    #[test]
    fn canonical_is_valid() {
        RiskConfig::canonical().validate().unwrap();
    }

    #[test]
    fn json_round_trip() {
        let mut config = RiskConfig::canonical();
        config.variability = VariabilityMethod::Offset { offset: SigmaOffset::PlusOne };
        config.grid_bins = (4, 3).into();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(RiskConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn json_uses_snake_case_names() {
        let json = r#"{
            "seed": 7,
            "distance_metric": "joyner_boore",
            "variability": {"method": "monte_carlo", "shared_across_periods": true},
            "recurrence_models": 2,
            "grid_bins": {"lon": 10, "lat": 5}
        }"#;
        let config = RiskConfig::from_json(json).unwrap();
        assert_eq!(config.distance_metric, DistanceMetric::JoynerBoore);
        assert_eq!(config.variability, VariabilityMethod::MonteCarlo { shared_across_periods: true });
        assert_eq!(config.grid_bins, GridBins { lon: 10, lat: 5 });
    }

    #[test]
    fn unknown_metric_is_invalid_config() {
        let json = r#"{"seed": 1, "distance_metric": "closest", "variability": {"method": "none"},
                       "recurrence_models": 1, "grid_bins": {"lon": 1, "lat": 1}}"#;
        assert!(matches!(RiskConfig::from_json(json), Err(RiskError::InvalidConfig(_))));
    }

    #[test]
    fn zero_counts_are_rejected() {
        let mut config = RiskConfig::canonical();
        config.recurrence_models = 0;
        assert!(config.validate().is_err());
        let mut config = RiskConfig::canonical();
        config.grid_bins = (0, 1).into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rng_is_reproducible_per_seed() {
        let config = RiskConfig::canonical();
        let a: u64 = config.rng().random();
        let b: u64 = config.rng().random();
        assert_eq!(a, b);
    }
}
