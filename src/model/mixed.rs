//! Linear mixed-effects models fit by REML
//!
//! The model for subject i is
//!
//! ```text
//! y_i = X_i beta + Z_i b_i + sum_k U_ik c_ik + eps_i
//! ```
//!
//! with `b_i ~ N(0, Psi)` unstructured (the random-effects formula,
//! default a subject intercept), named variance components
//! `c_ik ~ N(0, tau_k^2 I)` sharing one variance per component, and
//! `eps_i ~ N(0, sigma^2 I)`. Estimation runs an EM iteration over the
//! per-subject sufficient statistics with the fixed effects re-estimated
//! by GLS each pass; all per-subject solves go through the Woodbury
//! identity so only r x r systems are factored, where r is the total
//! random-effect dimension.

use std::fmt::Write as _;

use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use nalgebra::{Cholesky, DMatrix, DVector};
use rustc_hash::FxHashMap;

use super::design::{Design, design_matrix, response};
use super::formula::Formula;
use super::{FIT_TOL, MAX_ITER};
use crate::error::{NhanesError, Result};
use crate::utils::arrow::i64_values;

/// A linear mixed model bound to a table
#[derive(Debug)]
pub struct MixedModel<'a> {
    data: &'a RecordBatch,
    formula: Formula,
    groups: String,
    re: Formula,
    vc: Vec<(String, Formula)>,
}

/// Fitted mixed-model results
#[derive(Debug, Clone)]
pub struct MixedFit {
    /// Fixed-effect design column names, aligned with `params`
    pub fe_names: Vec<String>,
    /// Fixed-effect coefficients
    pub params: DVector<f64>,
    /// Standard errors of the fixed effects
    pub bse: DVector<f64>,
    /// Random-effect design column names
    pub re_names: Vec<String>,
    /// Estimated random-effects covariance (data units)
    pub cov_re: DMatrix<f64>,
    /// Named variance-component estimates (data units)
    pub vc: Vec<(String, f64)>,
    /// Residual variance estimate
    pub scale: f64,
    /// Restricted log-likelihood at the estimates
    pub loglike: f64,
    /// Number of observations
    pub nobs: usize,
    /// Number of groups
    pub ngroups: usize,
    /// EM iterations used
    pub iterations: usize,
}

/// Per-group sufficient statistics; the raw rows are not needed again
/// once these are formed.
struct GroupSuff {
    n: usize,
    xtx: DMatrix<f64>,
    ztx: DMatrix<f64>,
    a: DMatrix<f64>,
    xty: DVector<f64>,
    zty: DVector<f64>,
    yty: f64,
}

impl<'a> MixedModel<'a> {
    /// Build a mixed model from a fixed-effects formula and a grouping
    /// column, with a random intercept per group
    ///
    /// # Errors
    /// Returns an error if the formula is malformed
    pub fn from_formula(formula: &str, groups: &str, data: &'a RecordBatch) -> Result<Self> {
        Ok(Self {
            data,
            formula: Formula::parse(formula)?,
            groups: groups.to_string(),
            re: Formula::parse("1")?,
            vc: Vec::new(),
        })
    }

    /// Replace the random-effects structure
    ///
    /// # Errors
    /// Returns an error if the formula is malformed
    pub fn re_formula(mut self, text: &str) -> Result<Self> {
        self.re = Formula::parse(text)?;
        Ok(self)
    }

    /// Add a named variance component
    ///
    /// # Errors
    /// Returns an error if the formula is malformed
    pub fn vc_formula(mut self, name: &str, text: &str) -> Result<Self> {
        self.vc.push((name.to_string(), Formula::parse(text)?));
        Ok(self)
    }

    /// Fit the model by EM-accelerated REML
    ///
    /// # Errors
    /// Returns an error on missing columns, a degenerate design, or
    /// failure to converge within the iteration cap
    pub fn fit(&self) -> Result<MixedFit> {
        let y = response(&self.formula, self.data)?;
        let x = design_matrix(&self.formula, self.data)?;
        let z = design_matrix(&self.re, self.data)?;
        let vc_designs: Vec<(String, Design)> = self
            .vc
            .iter()
            .map(|(name, f)| Ok((name.clone(), design_matrix(f, self.data)?)))
            .collect::<Result<_>>()?;
        let group_ids = i64_values(self.data, &self.groups)?;

        let n = y.len();
        for nrows in std::iter::once(x.nrows())
            .chain(std::iter::once(z.nrows()))
            .chain(vc_designs.iter().map(|(_, d)| d.nrows()))
            .chain(std::iter::once(group_ids.len()))
        {
            if nrows != n {
                return Err(NhanesError::Shape(format!(
                    "design rows {nrows} disagree with {n} observations"
                )));
            }
        }

        let p = x.ncols();
        let q = z.ncols();
        let vc_dims: Vec<usize> = vc_designs.iter().map(|(_, d)| d.ncols()).collect();
        let r = q + vc_dims.iter().sum::<usize>();
        if n <= p {
            return Err(NhanesError::Shape(format!(
                "{n} observations cannot identify {p} fixed effects"
            )));
        }

        // Combined random-effects design [Z | U_1 | .. | U_K].
        let mut zfull = DMatrix::zeros(n, r);
        zfull.view_mut((0, 0), (n, q)).copy_from(&z.matrix);
        let mut offset = q;
        for (_, design) in &vc_designs {
            zfull
                .view_mut((0, offset), (n, design.ncols()))
                .copy_from(&design.matrix);
            offset += design.ncols();
        }

        let groups = group_rows(&group_ids);
        let suff: Vec<GroupSuff> = groups
            .iter()
            .map(|rows| group_suff(rows, &x.matrix, &zfull, &y))
            .collect();
        let m = suff.len();

        log::debug!(
            "Fitting mixed model: {} | groups {} ({} of them), re {}, {} variance components",
            self.formula,
            self.groups,
            m,
            self.re,
            vc_designs.len()
        );

        // Starting values split the response variance evenly between the
        // subject level and the residual.
        let var_y = (y.variance()).max(1e-8);
        let mut psi = DMatrix::identity(q, q) * (var_y / (2.0 * q as f64));
        let mut tau2 = vec![var_y / 4.0; vc_dims.len()];
        let mut sigma2 = var_y / 2.0;
        let mut beta = DVector::zeros(p);

        let mut state = pack(&beta, &psi, &tau2, sigma2);
        let mut last: Option<(DVector<f64>, Cholesky<f64, nalgebra::Dyn>, f64, usize)> = None;
        let mut prev_loglike: Option<f64> = None;

        for iteration in 1..=MAX_ITER {
            let (g_inv, ln_det_g) = g_inverse(&psi, &tau2, &vc_dims)?;

            // Per-group Woodbury factors and the GLS normal equations.
            let mut ws: Vec<Cholesky<f64, nalgebra::Dyn>> = Vec::with_capacity(m);
            let mut xtvx = DMatrix::zeros(p, p);
            let mut xtvy = DVector::zeros(p);
            for s in &suff {
                let m_i = &s.a / sigma2 + &g_inv;
                let chol = Cholesky::new(m_i).ok_or_else(|| {
                    NhanesError::Convergence(
                        "per-group precision matrix lost positive definiteness".to_string(),
                    )
                })?;
                let w = chol.inverse();
                xtvx += (&s.xtx - s.ztx.transpose() * &w * &s.ztx / sigma2) / sigma2;
                xtvy += (&s.xty - s.ztx.transpose() * (&w * &s.zty) / sigma2) / sigma2;
                ws.push(chol);
            }
            let xtvx_chol = Cholesky::new(xtvx).ok_or_else(|| {
                NhanesError::Convergence("fixed-effects normal equations are singular".to_string())
            })?;
            beta = xtvx_chol.solve(&xtvy);

            // M-step accumulators and the restricted log-likelihood.
            let mut psi_acc = DMatrix::zeros(q, q);
            let mut tau_acc = vec![0.0; tau2.len()];
            let mut sigma_acc = 0.0;
            let mut minus_two_ll = ln_det_g * m as f64;
            for (s, chol) in suff.iter().zip(&ws) {
                let w = chol.inverse();
                let ztr = &s.zty - &s.ztx * &beta;
                let u = &w * &ztr / sigma2;
                let rtr = s.yty - 2.0 * beta.dot(&s.xty) + beta.dot(&(&s.xtx * &beta));

                let e2 = rtr - 2.0 * u.dot(&ztr) + u.dot(&(&s.a * &u));
                sigma_acc += e2 + (&s.a * &w).trace();

                let u_q = u.rows(0, q).into_owned();
                psi_acc += &u_q * u_q.transpose() + w.view((0, 0), (q, q));
                let mut offset = q;
                for (k, dim) in vc_dims.iter().enumerate() {
                    let u_k = u.rows(offset, *dim);
                    let w_k = w.view((offset, offset), (*dim, *dim));
                    tau_acc[k] += u_k.norm_squared() + w_k.trace();
                    offset += dim;
                }

                minus_two_ll += s.n as f64 * sigma2.ln()
                    + chol.ln_determinant()
                    + (rtr - ztr.dot(&(&w * &ztr)) / sigma2) / sigma2;
            }
            minus_two_ll += xtvx_chol.ln_determinant()
                + (n - p) as f64 * (2.0 * std::f64::consts::PI).ln();
            let loglike = -0.5 * minus_two_ll;

            psi = psi_acc / m as f64;
            for (k, dim) in vc_dims.iter().enumerate() {
                tau2[k] = tau_acc[k] / (m as f64 * *dim as f64);
            }
            sigma2 = sigma_acc / (n - p) as f64;

            let next = pack(&beta, &psi, &tau2, sigma2);
            let delta = rel_change(&state, &next);
            state = next;

            // When a variance component's true value is zero the EM path
            // creeps toward the boundary and the step norm stalls just
            // above tolerance, so the objective is checked as well: once
            // the restricted log-likelihood stops moving the fit is done.
            let ll_step = prev_loglike
                .map_or(f64::INFINITY, |prev| (loglike - prev).abs() / (prev.abs() + 1e-10));
            prev_loglike = Some(loglike);
            last = Some((beta.clone(), xtvx_chol, loglike, iteration));
            if delta < FIT_TOL || ll_step < FIT_TOL {
                break;
            }
            if iteration == MAX_ITER {
                return Err(NhanesError::Convergence(format!(
                    "EM did not converge in {MAX_ITER} iterations (last step {delta:.2e})"
                )));
            }
        }

        let (beta, xtvx_chol, loglike, iterations) = last.ok_or_else(|| {
            NhanesError::Convergence("mixed model fit produced no iterations".to_string())
        })?;
        let fe_cov = xtvx_chol.inverse();
        let bse = DVector::from_iterator(p, (0..p).map(|j| fe_cov[(j, j)].sqrt()));

        Ok(MixedFit {
            fe_names: x.names,
            params: beta,
            bse,
            re_names: z.names,
            cov_re: psi,
            vc: vc_designs
                .iter()
                .map(|(name, _)| name.clone())
                .zip_eq(tau2.iter().copied())
                .collect(),
            scale: sigma2,
            loglike,
            nobs: n,
            ngroups: m,
            iterations,
        })
    }
}

impl MixedFit {
    /// Intraclass correlation for a random-intercept model: the share of
    /// total variance attributable to the subject level
    #[must_use]
    pub fn icc(&self) -> f64 {
        let between = self.cov_re[(0, 0)];
        between / (between + self.scale)
    }

    /// Multi-line coefficient and variance table for logging
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Mixed model fit (REML): {} observations, {} groups, {} iterations, loglike {:.2}",
            self.nobs, self.ngroups, self.iterations, self.loglike
        );
        for (i, name) in self.fe_names.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {name:<20} {:>12.4} (se {:.4})",
                self.params[i], self.bse[i]
            );
        }
        for (i, name) in self.re_names.iter().enumerate() {
            let _ = writeln!(out, "  re var {name:<13} {:>12.4}", self.cov_re[(i, i)]);
        }
        for (name, var) in &self.vc {
            let _ = writeln!(out, "  vc var {name:<13} {var:>12.4}");
        }
        let _ = writeln!(out, "  scale {:>25.4}", self.scale);
        out
    }
}

/// Row indices per group, in first-appearance order
fn group_rows(group_ids: &[i64]) -> Vec<Vec<usize>> {
    let mut index: FxHashMap<i64, usize> = FxHashMap::default();
    let mut rows: Vec<Vec<usize>> = Vec::new();
    for (row, id) in group_ids.iter().enumerate() {
        let slot = *index.entry(*id).or_insert_with(|| {
            rows.push(Vec::new());
            rows.len() - 1
        });
        rows[slot].push(row);
    }
    rows
}

/// Form the per-group sufficient statistics
fn group_suff(rows: &[usize], x: &DMatrix<f64>, zfull: &DMatrix<f64>, y: &DVector<f64>) -> GroupSuff {
    let n = rows.len();
    let p = x.ncols();
    let r = zfull.ncols();
    let x_i = DMatrix::from_fn(n, p, |a, b| x[(rows[a], b)]);
    let z_i = DMatrix::from_fn(n, r, |a, b| zfull[(rows[a], b)]);
    let y_i = DVector::from_fn(n, |a, _| y[rows[a]]);
    GroupSuff {
        n,
        xtx: x_i.transpose() * &x_i,
        ztx: z_i.transpose() * &x_i,
        a: z_i.transpose() * &z_i,
        xty: x_i.transpose() * &y_i,
        zty: z_i.transpose() * &y_i,
        yty: y_i.norm_squared(),
    }
}

/// Inverse and log-determinant of the block-diagonal random-effects
/// covariance
fn g_inverse(
    psi: &DMatrix<f64>,
    tau2: &[f64],
    vc_dims: &[usize],
) -> Result<(DMatrix<f64>, f64)> {
    let q = psi.nrows();
    let r = q + vc_dims.iter().sum::<usize>();
    let psi_chol = Cholesky::new(psi.clone()).ok_or_else(|| {
        NhanesError::Convergence("random-effects covariance lost positive definiteness".to_string())
    })?;

    let mut g_inv = DMatrix::zeros(r, r);
    g_inv.view_mut((0, 0), (q, q)).copy_from(&psi_chol.inverse());
    let mut ln_det = psi_chol.ln_determinant();
    let mut offset = q;
    for (k, dim) in vc_dims.iter().enumerate() {
        if tau2[k] <= 0.0 {
            return Err(NhanesError::Convergence(format!(
                "variance component {k} collapsed to zero"
            )));
        }
        for j in 0..*dim {
            g_inv[(offset + j, offset + j)] = 1.0 / tau2[k];
        }
        ln_det += *dim as f64 * tau2[k].ln();
        offset += dim;
    }
    Ok((g_inv, ln_det))
}

/// Flatten the parameter state for the convergence check
fn pack(beta: &DVector<f64>, psi: &DMatrix<f64>, tau2: &[f64], sigma2: f64) -> DVector<f64> {
    let mut out: Vec<f64> = beta.iter().copied().collect();
    out.extend(psi.iter().copied());
    out.extend_from_slice(tau2);
    out.push(sigma2);
    DVector::from_vec(out)
}

/// Relative change between parameter states, measured against the whole
/// state norm. A per-coordinate ratio would never settle for a variance
/// component whose estimate creeps toward zero.
fn rel_change(old: &DVector<f64>, new: &DVector<f64>) -> f64 {
    (new - old).norm() / (old.norm() + 1e-10)
}
