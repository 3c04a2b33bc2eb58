//! Ground-motion uncertainty propagation.
//!
//! Attenuation models describe shaking as a log-normal (log-mean, log-sigma)
//! per [gm-model, site, event, period]. A [`VariabilityMethod`] turns that
//! description into concrete intensities laid out as
//! [spawn, gm-model, recurrence, site, event, period] with one weight per
//! spawn branch. The six axes are always present.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array4, Array6, ArrayView4};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, RiskError};
use crate::shape::expect_shape;

pub const DEFAULT_SPAWN_BINS: usize = 5;

/// Standardized offsets of the outermost spawn branches.
pub const SPAWN_RANGE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaOffset {
    PlusTwo,
    PlusOne,
    MinusOne,
    MinusTwo,
}

impl SigmaOffset {
    pub fn sigmas(self) -> f64 {
        match self {
            SigmaOffset::PlusTwo => 2.0,
            SigmaOffset::PlusOne => 1.0,
            SigmaOffset::MinusOne => -1.0,
            SigmaOffset::MinusTwo => -2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VariabilityMethod {
    /// exp(log-mean); no variability.
    None,
    /// One standard-normal draw per element, or per (gm-model, site, event)
    /// when `shared_across_periods` so a spectrum moves together.
    MonteCarlo { shared_across_periods: bool },
    /// exp(log-mean + k·sigma) for a fixed k.
    Offset { offset: SigmaOffset },
    /// Weighted branches evenly spaced over ±2.5 sigma.
    Spawn { bins: usize },
}

impl VariabilityMethod {
    /// Legacy numeric codes: 1 spawn, 2 Monte Carlo, 3 +2σ, 4 +1σ, 5 −1σ,
    /// 6 −2σ, absent for no variability.
    pub fn from_code(code: Option<u8>, spawn_bins: usize) -> Result<Self> {
        Ok(match code {
            None => VariabilityMethod::None,
            Some(1) => VariabilityMethod::Spawn { bins: spawn_bins },
            Some(2) => VariabilityMethod::MonteCarlo { shared_across_periods: false },
            Some(3) => VariabilityMethod::Offset { offset: SigmaOffset::PlusTwo },
            Some(4) => VariabilityMethod::Offset { offset: SigmaOffset::PlusOne },
            Some(5) => VariabilityMethod::Offset { offset: SigmaOffset::MinusOne },
            Some(6) => VariabilityMethod::Offset { offset: SigmaOffset::MinusTwo },
            Some(c) => {
                return Err(RiskError::InvalidConfig(format!("unknown variability code {c}")));
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            VariabilityMethod::None => "none",
            VariabilityMethod::MonteCarlo { .. } => "monte-carlo",
            VariabilityMethod::Offset { offset: SigmaOffset::PlusTwo } => "+2sigma",
            VariabilityMethod::Offset { offset: SigmaOffset::PlusOne } => "+1sigma",
            VariabilityMethod::Offset { offset: SigmaOffset::MinusOne } => "-1sigma",
            VariabilityMethod::Offset { offset: SigmaOffset::MinusTwo } => "-2sigma",
            VariabilityMethod::Spawn { .. } => "spawn",
        }
    }
}

impl fmt::Display for VariabilityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariabilityMethod::Spawn { bins } => write!(f, "spawn({bins})"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for VariabilityMethod {
    type Err = RiskError;

    /// Names as printed by `name()`; `spawn` gets [`DEFAULT_SPAWN_BINS`].
    fn from_str(s: &str) -> Result<Self> {
        let method = match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => VariabilityMethod::None,
            "monte-carlo" | "random" => VariabilityMethod::MonteCarlo { shared_across_periods: false },
            "+2sigma" => VariabilityMethod::Offset { offset: SigmaOffset::PlusTwo },
            "+1sigma" => VariabilityMethod::Offset { offset: SigmaOffset::PlusOne },
            "-1sigma" => VariabilityMethod::Offset { offset: SigmaOffset::MinusOne },
            "-2sigma" => VariabilityMethod::Offset { offset: SigmaOffset::MinusTwo },
            "spawn" => VariabilityMethod::Spawn { bins: DEFAULT_SPAWN_BINS },
            _ => {
                return Err(RiskError::InvalidConfig(format!("unknown variability method '{s}'")));
            }
        };
        Ok(method)
    }
}

/// Sampled intensities (g) and their branch weights.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundMotionSample {
    /// [spawn, gm-model, recurrence, site, event, period]
    pub values: Array6<f64>,
    /// One probability mass per spawn branch; sums to 1.
    pub weights: Array1<f64>,
}

impl GroundMotionSample {
    pub fn branches(&self) -> usize {
        self.weights.len()
    }

    pub fn sites(&self) -> usize {
        self.values.dim().3
    }

    pub fn events(&self) -> usize {
        self.values.dim().4
    }

    pub fn periods(&self) -> usize {
        self.values.dim().5
    }
}

/// exp(x), saturating at `f64::MAX` instead of overflowing to infinity.
pub fn saturating_exp(x: f64) -> f64 {
    let v = x.exp();
    if v == f64::INFINITY { f64::MAX } else { v }
}

/// Standardized offsets and normalized weights for `bins` spawn branches.
/// Fewer than two bins collapse to a single branch at the mean.
pub fn spawn_offsets(bins: usize) -> (Vec<f64>, Vec<f64>) {
    if bins <= 1 {
        return (vec![0.0], vec![1.0]);
    }
    let step = 2.0 * SPAWN_RANGE / (bins - 1) as f64;
    let offsets: Vec<f64> = (0..bins).map(|i| -SPAWN_RANGE + step * i as f64).collect();
    // Normal density; the 1/sqrt(2π) factor cancels on normalization.
    let density: Vec<f64> = offsets.iter().map(|z| (-0.5 * z * z).exp()).collect();
    let total: f64 = density.iter().sum();
    let weights = density.iter().map(|d| d / total).collect();
    (offsets, weights)
}

enum Deviates {
    /// No variability: exactly exp(log-mean).
    Zero,
    /// One fixed standardized offset per branch.
    Fixed(Vec<f64>),
    /// Drawn variates indexed [gm-model, site, event, period or 0].
    Drawn { variates: Array4<f64>, shared: bool },
}

/// Turn log-mean/log-sigma into sampled ground motion.
///
/// `log_mean` and `log_sigma` are [gm-model, site, event, period] and must
/// share a shape. `recurrence_models` only widens the output; sampling does
/// not depend on it. `rng` is only drawn from by the Monte Carlo method, in
/// row-major element order, so a fixed seed reproduces the same sample.
#[instrument(skip_all, fields(method = %method, shape = ?log_mean.dim(), recurrence_models = recurrence_models))]
pub fn sample_ground_motion<R: Rng + ?Sized>(
    log_mean: ArrayView4<'_, f64>,
    log_sigma: ArrayView4<'_, f64>,
    method: VariabilityMethod,
    recurrence_models: usize,
    rng: &mut R,
) -> Result<GroundMotionSample> {
    expect_shape("log sigma", log_mean.shape(), log_sigma.shape())?;
    if recurrence_models == 0 {
        return Err(RiskError::InvalidConfig("at least one recurrence model is required".into()));
    }
    if let Some((index, &value)) =
        log_sigma.iter().enumerate().find(|(_, s)| !(s.is_finite() && **s >= 0.0))
    {
        return Err(RiskError::InvalidInput { what: "log sigma", index, value });
    }

    let (n_gmm, n_sites, n_events, n_periods) = log_mean.dim();
    let (deviates, weights) = match method {
        VariabilityMethod::None => (Deviates::Zero, vec![1.0]),
        VariabilityMethod::Offset { offset } => (Deviates::Fixed(vec![offset.sigmas()]), vec![1.0]),
        VariabilityMethod::Spawn { bins } => {
            let (offsets, weights) = spawn_offsets(bins);
            (Deviates::Fixed(offsets), weights)
        }
        VariabilityMethod::MonteCarlo { shared_across_periods } => {
            let last = if shared_across_periods { 1 } else { n_periods };
            let variates = Array4::from_shape_simple_fn((n_gmm, n_sites, n_events, last), || {
                rng.sample::<f64, _>(StandardNormal)
            });
            (Deviates::Drawn { variates, shared: shared_across_periods }, vec![1.0])
        }
    };

    let branches = weights.len();
    let values = Array6::from_shape_fn(
        (branches, n_gmm, recurrence_models, n_sites, n_events, n_periods),
        |(b, g, _, s, e, p)| {
            let mean = log_mean[[g, s, e, p]];
            let sigma = log_sigma[[g, s, e, p]];
            match &deviates {
                Deviates::Zero => saturating_exp(mean),
                Deviates::Fixed(offsets) => saturating_exp(mean + offsets[b] * sigma),
                Deviates::Drawn { variates, shared } => {
                    let z = variates[[g, s, e, if *shared { 0 } else { p }]];
                    saturating_exp(mean + z * sigma)
                }
            }
        },
    );

    debug!(branches, elements = values.len(), "ground motion sampled");
    Ok(GroundMotionSample { values, weights: Array1::from(weights) })
}
