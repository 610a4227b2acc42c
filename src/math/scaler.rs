//! Per-feature standardization.
//!
//! The scaler is fit once on the full training matrix and stored in the model bundle.
//! At scoring time the same mean/scale pair is applied to every projected row.
//!
//! Implementation choices:
//! - Population standard deviation (divide by n), the convention most scoring
//!   stacks use for standardization.
//! - A zero-variance column gets scale 1.0 so it maps to 0 instead of NaN.
//! - Parameters are stored as plain `Vec<f64>` so the bundle stays readable JSON.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean/scale column-wise. Returns `None` for an empty matrix.
    pub fn fit(x: &DMatrix<f64>) -> Option<Self> {
        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return None;
        }
        let nf = n as f64;

        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for column in x.column_iter() {
            let m = column.iter().sum::<f64>() / nf;
            let var = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / nf;
            let sd = var.sqrt();
            mean.push(m);
            scale.push(if sd > 0.0 && sd.is_finite() { sd } else { 1.0 });
        }

        Some(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardize a matrix. Returns `None` if the column count does not match.
    pub fn transform(&self, x: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        if x.ncols() != self.n_features() {
            return None;
        }
        Some(DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            (x[(i, j)] - self.mean[j]) / self.scale[j]
        }))
    }

    pub fn fit_transform(x: &DMatrix<f64>) -> Option<(Self, DMatrix<f64>)> {
        let scaler = Self::fit(x)?;
        let z = scaler.transform(x)?;
        Some((scaler, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_columns_and_handles_constant_column() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 5.0, 2.0, 5.0, 3.0, 5.0, 4.0, 5.0]);
        let (scaler, z) = StandardScaler::fit_transform(&x).unwrap();

        assert!((scaler.mean()[0] - 2.5).abs() < 1e-12);
        assert!((scaler.scale()[0] - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(scaler.scale()[1], 1.0);

        let col0_mean: f64 = z.column(0).iter().sum::<f64>() / 4.0;
        assert!(col0_mean.abs() < 1e-12);
        assert!(z.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rejects_wrong_width_and_empty_input() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let scaler = StandardScaler::fit(&x).unwrap();
        assert!(scaler.transform(&DMatrix::zeros(1, 3)).is_none());
        assert!(StandardScaler::fit(&DMatrix::<f64>::zeros(0, 2)).is_none());
    }
}
