//! Contract for the external damage model and the per-site loss loop.

use ndarray::{Array1, Array4, ArrayView2, s};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::ground_motion::GroundMotionSample;
use crate::shape::expect_len;

/// Maps shaking at one site to a loss per event.
///
/// `sa` is spectral acceleration (g) laid out [event, period]. The returned
/// array must hold one non-negative loss per event.
pub trait DamageModel: Sync {
    fn site_losses(
        &self,
        site: usize,
        sa: ArrayView2<'_, f64>,
        periods: &[f64],
        magnitudes: &[f64],
    ) -> Result<Array1<f64>>;
}

impl<F> DamageModel for F
where
    F: Fn(usize, ArrayView2<'_, f64>, &[f64], &[f64]) -> Result<Array1<f64>> + Sync,
{
    fn site_losses(
        &self,
        site: usize,
        sa: ArrayView2<'_, f64>,
        periods: &[f64],
        magnitudes: &[f64],
    ) -> Result<Array1<f64>> {
        self(site, sa, periods, magnitudes)
    }
}

/// Portfolio loss per [spawn, gm-model, recurrence, event].
///
/// Sites are evaluated in parallel and summed in site order, so the result
/// is identical to a sequential loop.
#[instrument(skip_all, fields(sites = sample.sites(), events = sample.events(), branches = sample.branches()))]
pub fn event_losses<M: DamageModel + ?Sized>(
    model: &M,
    sample: &GroundMotionSample,
    periods: &[f64],
    magnitudes: &[f64],
) -> Result<Array4<f64>> {
    let (n_spawn, n_gmm, n_rec, n_sites, n_events, n_periods) = sample.values.dim();
    expect_len("periods", n_periods, periods.len())?;
    expect_len("magnitudes", n_events, magnitudes.len())?;
    let dim = (n_spawn, n_gmm, n_rec, n_events);

    let per_site: Vec<Array4<f64>> = (0..n_sites)
        .into_par_iter()
        .map(|site| -> Result<Array4<f64>> {
            let mut site_loss = Array4::<f64>::zeros(dim);
            for b in 0..n_spawn {
                for g in 0..n_gmm {
                    for r in 0..n_rec {
                        let sa = sample.values.slice(s![b, g, r, site, .., ..]);
                        let losses = model.site_losses(site, sa, periods, magnitudes)?;
                        expect_len("site losses", n_events, losses.len())?;
                        site_loss.slice_mut(s![b, g, r, ..]).assign(&losses);
                    }
                }
            }
            Ok(site_loss)
        })
        .collect::<Result<_>>()?;

    let total = per_site.into_iter().fold(Array4::<f64>::zeros(dim), |acc, site_loss| acc + site_loss);
    debug!(total_loss = total.sum(), "event losses aggregated");
    Ok(total)
}
