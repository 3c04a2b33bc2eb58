use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::annloss::calc_annloss;
use crate::error::{Result, RiskError};
use crate::shape::{expect_finite, expect_len};
use crate::types::Sites;

/// Number of grid cells along longitude (x) and latitude (y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBins {
    pub lon: usize,
    pub lat: usize,
}

impl From<usize> for GridBins {
    fn from(n: usize) -> Self {
        GridBins { lon: n, lat: n }
    }
}

impl From<(usize, usize)> for GridBins {
    /// `(x, y)`: longitude bins, then latitude bins.
    fn from((lon, lat): (usize, usize)) -> Self {
        GridBins { lon, lat }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridDeagg {
    /// `lat + 1` edges, ascending.
    pub lat_edges: Vec<f64>,
    /// `lon + 1` edges, ascending.
    pub lon_edges: Vec<f64>,
    /// Annualized loss of each cell as a fraction of its value, [lat, lon].
    /// NaN for empty cells.
    pub loss: Array2<f64>,
    /// Summed building value per cell, [lat, lon]. NaN for empty cells.
    pub value: Array2<f64>,
}

impl GridDeagg {
    /// Annualized loss in currency per cell (NaN for empty cells).
    pub fn dollars(&self) -> Array2<f64> {
        &self.loss * &self.value
    }

    pub fn non_empty_cells(&self) -> usize {
        self.value.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Equal-width bin edges over the data range. A degenerate range is padded
/// by half a unit either side.
pub fn bin_edges(values: &[f64], bins: usize) -> Vec<f64> {
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if values.is_empty() {
        (lo, hi) = (0.0, 1.0);
    } else if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let step = (hi - lo) / bins as f64;
    (0..=bins).map(|i| if i == bins { hi } else { lo + step * i as f64 }).collect()
}

/// Bin containing `v`; the last bin includes its right edge.
fn bin_index(v: f64, edges: &[f64]) -> usize {
    let bins = edges.len() - 1;
    let lo = edges[0];
    let hi = edges[bins];
    let idx = ((v - lo) / (hi - lo) * bins as f64).floor() as usize;
    idx.min(bins - 1)
}

/// Annualized loss per latitude/longitude cell.
///
/// `loss` is [site, event]; `activity` has one rate per event and
/// `building_value` one value per site. Each non-empty cell integrates the
/// summed loss of its own sites against the full event set and normalizes by
/// the cell's summed value.
#[instrument(skip_all, fields(sites = sites.len(), events = activity.len(), bins = ?bins))]
pub fn calc_annloss_deagg_grid(
    sites: &Sites,
    building_value: &[f64],
    loss: ArrayView2<'_, f64>,
    activity: &[f64],
    bins: GridBins,
) -> Result<GridDeagg> {
    sites.validate()?;
    if bins.lat == 0 || bins.lon == 0 {
        return Err(RiskError::InvalidConfig(format!("grid needs at least one bin per axis, got {bins:?}")));
    }
    let (n_sites, n_events) = loss.dim();
    expect_len("site loss rows", sites.len(), n_sites)?;
    expect_len("event activity", n_events, activity.len())?;
    expect_len("building value", sites.len(), building_value.len())?;
    expect_finite("building value", building_value)?;
    if let Some((index, &value)) = building_value.iter().enumerate().find(|(_, v)| **v < 0.0) {
        return Err(RiskError::InvalidInput { what: "building value", index, value });
    }

    let lat_edges = bin_edges(&sites.latitude, bins.lat);
    let lon_edges = bin_edges(&sites.longitude, bins.lon);

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); bins.lat * bins.lon];
    for site in 0..n_sites {
        let row = bin_index(sites.latitude[site], &lat_edges);
        let col = bin_index(sites.longitude[site], &lon_edges);
        members[row * bins.lon + col].push(site);
    }

    let mut cell_loss = Array2::from_elem((bins.lat, bins.lon), f64::NAN);
    let mut cell_value = Array2::from_elem((bins.lat, bins.lon), f64::NAN);
    for (cell, sites_in_cell) in members.iter().enumerate() {
        if sites_in_cell.is_empty() {
            continue;
        }
        let mut event_loss = Array1::<f64>::zeros(n_events);
        for &site in sites_in_cell {
            event_loss += &loss.row(site);
        }
        let value: f64 = sites_in_cell.iter().map(|&s| building_value[s]).sum();
        let annual = calc_annloss(&event_loss.to_vec(), activity, value)?;
        let idx = (cell / bins.lon, cell % bins.lon);
        cell_loss[idx] = annual.dollars / value;
        cell_value[idx] = value;
    }

    let out = GridDeagg { lat_edges, lon_edges, loss: cell_loss, value: cell_value };
    debug!(non_empty = out.non_empty_cells(), "grid deaggregation complete");
    Ok(out)
}
