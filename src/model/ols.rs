//! Ordinary least squares

use std::fmt::Write as _;

use arrow::record_batch::RecordBatch;
use nalgebra::{DMatrix, DVector};

use super::design::{Design, design_matrix, response};
use super::formula::Formula;
use crate::error::{NhanesError, Result};

/// An ordinary least squares model bound to a table
#[derive(Debug)]
pub struct Ols {
    formula: Formula,
    design: Design,
    y: DVector<f64>,
}

/// Fitted OLS results
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Design column names, aligned with `params`
    pub names: Vec<String>,
    /// Estimated coefficients
    pub params: DVector<f64>,
    /// Standard errors of the coefficients
    pub bse: DVector<f64>,
    /// Residual variance estimate (RSS / (n - p))
    pub scale: f64,
    /// Coefficient of determination
    pub rsquared: f64,
    /// Number of observations
    pub nobs: usize,
}

impl Ols {
    /// Build an OLS model from a formula and a table
    ///
    /// # Errors
    /// Returns an error if the formula is malformed or references missing
    /// columns
    pub fn from_formula(formula: &str, data: &RecordBatch) -> Result<Self> {
        let formula = Formula::parse(formula)?;
        let y = response(&formula, data)?;
        let design = design_matrix(&formula, data)?;
        if design.nrows() != y.len() {
            return Err(NhanesError::Shape(format!(
                "design has {} rows but response has {}",
                design.nrows(),
                y.len()
            )));
        }
        Ok(Self { formula, design, y })
    }

    /// Fit the model by singular value decomposition
    ///
    /// # Errors
    /// Returns an error if the decomposition fails or the design has more
    /// columns than rows
    pub fn fit(&self) -> Result<OlsFit> {
        let x = &self.design.matrix;
        let y = &self.y;
        let n = x.nrows();
        let p = x.ncols();
        if n <= p {
            return Err(NhanesError::Shape(format!(
                "{n} observations cannot identify {p} coefficients"
            )));
        }

        log::debug!("Fitting OLS: {} ({} rows)", self.formula, n);

        let svd = x.clone().svd(true, true);
        let params = svd
            .solve(y, f64::EPSILON.sqrt())
            .map_err(|e| NhanesError::Convergence(format!("SVD solve failed: {e}")))?;

        let residuals = y - x * &params;
        let rss = residuals.norm_squared();
        let scale = rss / (n - p) as f64;

        // (X'X)^-1 through the decomposition, skipping negligible singular
        // values to tolerate a rank-deficient design.
        let v_t = svd
            .v_t
            .as_ref()
            .ok_or_else(|| NhanesError::Convergence("SVD did not produce V^T".to_string()))?;
        let cutoff = f64::EPSILON.sqrt() * svd.singular_values.max();
        let inv_s2 = DMatrix::from_diagonal(&svd.singular_values.map(|s| {
            if s > cutoff { 1.0 / (s * s) } else { 0.0 }
        }));
        let xtx_inv = v_t.transpose() * inv_s2 * v_t;
        let bse = DVector::from_iterator(p, (0..p).map(|j| (scale * xtx_inv[(j, j)]).sqrt()));

        // Centered total sum of squares when an intercept is present.
        let tss = if self.formula.intercept {
            let mean = y.mean();
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        } else {
            y.norm_squared()
        };
        let rsquared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };

        Ok(OlsFit {
            names: self.design.names.clone(),
            params,
            bse,
            scale,
            rsquared,
            nobs: n,
        })
    }
}

impl OlsFit {
    /// Multi-line coefficient table for logging
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "OLS fit: {} observations, scale {:.4}, R^2 {:.4}",
            self.nobs, self.scale, self.rsquared
        );
        for (i, name) in self.names.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {name:<20} {:>12.4} (se {:.4})",
                self.params[i], self.bse[i]
            );
        }
        out
    }
}
