use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, RiskError};
use crate::shape::{expect_len, expect_shape};

/// One point of the loss-exceedance (PML) curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExceedancePoint {
    /// 1 / annual_rate (years); infinite while no rate has accumulated.
    pub return_period: f64,
    /// Cumulative rate of events with loss ≥ `loss` (per year).
    pub annual_rate: f64,
    /// One-year exceedance probability, 1 − exp(−rate).
    pub annual_probability: f64,
    /// Event loss at this rank (currency).
    pub loss: f64,
    /// Integrated loss from this rank up to the largest event (currency).
    pub dollars: f64,
    /// `dollars` as a percentage of portfolio value.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualizedLoss {
    pub dollars: f64,
    pub percent: f64,
    /// Ordered by descending loss / ascending return period.
    pub curve: Vec<ExceedancePoint>,
}

/// Expected annualized loss and the PML curve for a set of events.
///
/// Events are ranked by descending loss (stable for ties) and their rates
/// accumulated. The integral runs backwards from the largest loss, adding per
/// segment a triangle ½·|ΔL|·|ΔR| and a rectangle |ΔR|·min(L) so the last
/// rank contributes zero. Rates may be zero; they must not be negative.
#[instrument(skip_all, fields(events = loss.len(), total_value = total_value))]
pub fn calc_annloss(loss: &[f64], activity: &[f64], total_value: f64) -> Result<AnnualizedLoss> {
    expect_len("event activity", loss.len(), activity.len())?;
    if !(total_value.is_finite() && total_value > 0.0) {
        return Err(RiskError::NonPositiveValue { value: total_value });
    }
    check_non_negative("event loss", loss)?;
    check_non_negative("event activity", activity)?;

    let mut order: Vec<usize> = (0..loss.len()).collect();
    order.sort_by(|&a, &b| loss[b].total_cmp(&loss[a]));
    let sorted_loss: Vec<f64> = order.iter().map(|&i| loss[i]).collect();
    let cumulative_rate: Vec<f64> = order
        .iter()
        .scan(0.0, |acc, &i| {
            *acc += activity[i];
            Some(*acc)
        })
        .collect();

    let integrated = integrate_backwards(&sorted_loss, &cumulative_rate);
    let to_percent = |d: f64| d / total_value * 100.0;

    let curve: Vec<ExceedancePoint> = sorted_loss
        .iter()
        .zip(&cumulative_rate)
        .zip(&integrated)
        .map(|((&l, &r), &d)| ExceedancePoint {
            return_period: 1.0 / r,
            annual_rate: r,
            annual_probability: -(-r).exp_m1(),
            loss: l,
            dollars: d,
            percent: to_percent(d),
        })
        .collect();

    let dollars = integrated.first().copied().unwrap_or(0.0);
    debug!(dollars, "annualized loss");
    Ok(AnnualizedLoss { dollars, percent: to_percent(dollars), curve })
}

fn integrate_backwards(sorted_loss: &[f64], cumulative_rate: &[f64]) -> Vec<f64> {
    let n = sorted_loss.len();
    let mut acc = vec![0.0; n];
    for s in (0..n.saturating_sub(1)).rev() {
        let d_loss = (sorted_loss[s + 1] - sorted_loss[s]).abs();
        let d_rate = (cumulative_rate[s + 1] - cumulative_rate[s]).abs();
        let triangle = 0.5 * d_loss * d_rate;
        let rectangle = d_rate * sorted_loss[s].min(sorted_loss[s + 1]);
        acc[s] = acc[s + 1] + triangle + rectangle;
    }
    acc
}

fn check_non_negative(what: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().enumerate().find(|(_, v)| !(v.is_finite() && **v >= 0.0)) {
        Some((index, &value)) => Err(RiskError::InvalidInput { what, index, value }),
        None => Ok(()),
    }
}

/// Per-branch rates: event rate × spawn weight × gm-model weight × recurrence
/// weight, laid out [spawn, gm-model, recurrence, event].
pub fn branch_activity(
    event_activity: &[f64],
    spawn_weights: &[f64],
    gm_model_weights: &[f64],
    recurrence_weights: &[f64],
) -> Array4<f64> {
    Array4::from_shape_fn(
        (spawn_weights.len(), gm_model_weights.len(), recurrence_weights.len(), event_activity.len()),
        |(b, g, r, e)| event_activity[e] * spawn_weights[b] * gm_model_weights[g] * recurrence_weights[r],
    )
}

/// Integrate every (branch, event) pair as its own weighted pseudo-event.
pub fn calc_annloss_branches(
    loss: ArrayView4<'_, f64>,
    activity: ArrayView4<'_, f64>,
    total_value: f64,
) -> Result<AnnualizedLoss> {
    expect_shape("branch activity", loss.shape(), activity.shape())?;
    let loss: Vec<f64> = loss.iter().copied().collect();
    let activity: Vec<f64> = activity.iter().copied().collect();
    calc_annloss(&loss, &activity, total_value)
}
