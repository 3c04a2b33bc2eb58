//! Explicit shape checks and broadcasting.
//!
//! Nothing in this crate promotes a vector to a matrix implicitly: a site
//! column and an event row are combined only through the helpers below, so a
//! wrong-length input fails at the boundary instead of broadcasting silently.

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{Result, RiskError};

pub fn expect_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RiskError::ShapeMismatch { what, expected, actual })
    }
}

/// Compare two array shapes axis by axis, reporting the first disagreement.
pub fn expect_shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Result<()> {
    expect_len(what, expected.len(), actual.len())?;
    for (&e, &a) in expected.iter().zip(actual) {
        expect_len(what, e, a)?;
    }
    Ok(())
}

pub fn expect_finite(what: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        Some((index, &value)) => Err(RiskError::InvalidInput { what, index, value }),
        None => Ok(()),
    }
}

/// Repeat an event row down `rows` site rows.
pub fn broadcast_row(row: &[f64], rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, row.len()), |(_, j)| row[j])
}

/// Repeat a site column across `cols` event columns.
pub fn broadcast_column(column: &[f64], cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((column.len(), cols), |(i, _)| column[i])
}

/// Promote a site column and an event row to a pair of S×E matrices.
pub fn outer_product(column: &[f64], row: &[f64]) -> (Array2<f64>, Array2<f64>) {
    (broadcast_column(column, row.len()), broadcast_row(row, column.len()))
}

/// Evaluate `f(site, event)` over the full S×E grid, one rayon task per site row.
/// Rows are assembled in site order, so the result does not depend on scheduling.
pub fn outer_map<F>(rows: usize, cols: usize, f: F) -> Result<Array2<f64>>
where
    F: Fn(usize, usize) -> Result<f64> + Sync,
{
    let per_row: Vec<Vec<f64>> = (0..rows)
        .into_par_iter()
        .map(|i| (0..cols).map(|j| f(i, j)).collect::<Result<Vec<f64>>>())
        .collect::<Result<Vec<_>>>()?;
    let flat: Vec<f64> = per_row.into_iter().flatten().collect();
    let len = flat.len();
    Array2::from_shape_vec((rows, cols), flat).map_err(|_| RiskError::ShapeMismatch {
        what: "outer map",
        expected: rows * cols,
        actual: len,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn outer_product_promotes_both_axes() {
        let (sites, events) = outer_product(&[1.0, 2.0], &[10.0, 20.0, 30.0]);
        assert_eq!(sites, array![[1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]);
        assert_eq!(events, array![[10.0, 20.0, 30.0], [10.0, 20.0, 30.0]]);
    }

    #[test]
    fn outer_map_preserves_site_event_order() {
        let m = outer_map(3, 2, |i, j| Ok((i * 10 + j) as f64)).unwrap();
        assert_eq!(m, array![[0.0, 1.0], [10.0, 11.0], [20.0, 21.0]]);
    }

    #[test]
    fn outer_map_propagates_the_first_error() {
        let err = outer_map(4, 4, |i, _| {
            if i == 2 {
                Err(RiskError::Projection("boom".into()))
            } else {
                Ok(0.0)
            }
        })
        .unwrap_err();
        assert_eq!(err, RiskError::Projection("boom".into()));
    }

    #[test]
    fn expect_shape_reports_first_bad_axis() {
        let err = expect_shape("log sigma", &[2, 3, 4], &[2, 5, 4]).unwrap_err();
        assert_eq!(err, RiskError::ShapeMismatch { what: "log sigma", expected: 3, actual: 5 });
    }

    #[test]
    fn empty_grids_are_allowed() {
        let m = outer_map(0, 5, |_, _| Ok(1.0)).unwrap();
        assert_eq!(m.dim(), (0, 5));
    }
}
