//! Probabilistic earthquake risk: site-to-rupture distances, ground-motion
//! uncertainty propagation and annualized loss / PML curves.
//!
//! Every operation is a pure function of its inputs. Randomness only enters
//! through a generator the caller passes in.

pub mod annloss;
pub mod config;
pub mod damage;
pub mod deagg;
pub mod distance;
pub mod error;
pub mod ground_motion;
pub mod projection;
pub mod shape;
pub mod types;

pub use annloss::{AnnualizedLoss, ExceedancePoint, branch_activity, calc_annloss, calc_annloss_branches};
pub use config::RiskConfig;
pub use damage::{DamageModel, event_losses};
pub use deagg::{GridBins, GridDeagg, calc_annloss_deagg_grid};
pub use distance::{DISTANCE_LIMIT, DistanceMetric, distance_matrix};
pub use error::{Result, RiskError};
pub use ground_motion::{GroundMotionSample, SigmaOffset, VariabilityMethod, sample_ground_motion};
pub use projection::{AzimuthalOrthographic, Planar, Projection};
pub use types::{RuptureGeometry, Ruptures, Sites};

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array4, ArrayView2};

    use super::*;

    /// Toy attenuation: ln SA = 0.5·M − 1.2·ln R − 3.
    fn log_mean(distances: &ndarray::Array2<f64>, magnitudes: &[f64]) -> Array4<f64> {
        let (n_sites, n_events) = distances.dim();
        Array4::from_shape_fn((1, n_sites, n_events, 1), |(_, s, e, _)| {
            0.5 * magnitudes[e] - 1.2 * distances[[s, e]].ln() - 3.0
        })
    }

    fn capped_damage(_: usize, sa: ArrayView2<'_, f64>, _: &[f64], _: &[f64]) -> Result<Array1<f64>> {
        Ok(sa.column(0).mapv(|g| 1_000.0 * g.min(1.0)))
    }

    #[test]
    fn pipeline_end_to_end() {
        let config = RiskConfig::canonical();
        let sites = Sites::new(vec![-33.87, -33.90, -34.00], vec![151.20, 151.10, 150.90]).unwrap();
        let ruptures = Ruptures::from_rows(&[
            RuptureGeometry {
                latitude: -33.95,
                longitude: 151.00,
                length: 20.0,
                width: 10.0,
                azimuth: 45.0,
                dip: 35.0,
                depth: 6.0,
                depth_to_top: 3.13,
            },
            RuptureGeometry {
                latitude: -34.30,
                longitude: 150.60,
                length: 5.0,
                width: 4.0,
                azimuth: 200.0,
                dip: 70.0,
                depth: 10.0,
                depth_to_top: 8.12,
            },
        ]);
        let magnitudes = [6.5, 5.2];
        let activity = [0.002, 0.01];

        let distances = distance_matrix(
            config.distance_metric,
            &sites,
            &ruptures,
            &AzimuthalOrthographic::default(),
        )
        .unwrap();
        assert!(distances.iter().all(|&d| d >= DISTANCE_LIMIT));

        let mean = log_mean(&distances, &magnitudes);
        let sigma = Array4::from_elem(mean.dim(), 0.6);
        let mut rng = config.rng();
        let gm = sample_ground_motion(
            mean.view(),
            sigma.view(),
            config.variability,
            config.recurrence_models,
            &mut rng,
        )
        .unwrap();
        assert_eq!(gm.branches(), 5);

        let losses = event_losses(&capped_damage, &gm, &[0.0], &magnitudes).unwrap();
        let rates = branch_activity(&activity, gm.weights.as_slice().unwrap(), &[1.0], &[1.0]);
        let portfolio_value = 3_000.0;
        let annual = calc_annloss_branches(losses.view(), rates.view(), portfolio_value).unwrap();
        assert_eq!(annual.curve.len(), 10);
        assert!(annual.dollars > 0.0);
        assert!(annual.percent > 0.0 && annual.percent < 100.0);

        // Same seed, same answer.
        let mut rng = config.rng();
        let again = sample_ground_motion(
            mean.view(),
            sigma.view(),
            config.variability,
            config.recurrence_models,
            &mut rng,
        )
        .unwrap();
        assert_eq!(gm, again);
    }
}
