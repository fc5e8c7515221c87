//! The blood-pressure modeling sequence
//!
//! Eight fits over the shared long table, in a fixed order, each one a
//! pure function of the table. The sequence walks from a deliberately
//! misspecified pooled OLS to mixed models with progressively richer
//! random structure, comparing strategies for the within-subject
//! correlation of repeated readings.

use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::model::{MixedFit, MixedModel, Ols, OlsFit};
use crate::reshape::{SUBJECT_KEY, filter_eq_utf8, head};

/// Fixed-effects formula shared by the pooled fits
const POOLED_FORMULA: &str = "bp ~ RIDAGEYR + female + C(bpt) + BMXBMI";

/// Fixed-effects formula for the single-type fits
const SINGLE_TYPE_FORMULA: &str = "bp ~ RIDAGEYR + female + BMXBMI";

/// All fit results, held in memory for inspection
#[derive(Debug)]
pub struct AnalysisReport {
    /// 1: pooled OLS ignoring the repeated-measures structure
    pub ols_pooled: OlsFit,
    /// 2: systolic-only random intercept per subject
    pub systolic_intercept: MixedFit,
    /// Intraclass correlation from fit 2
    pub systolic_icc: f64,
    /// 3: diastolic-only random intercept per subject
    pub diastolic_intercept: MixedFit,
    /// Intraclass correlation from fit 3
    pub diastolic_icc: f64,
    /// 4: diastolic-only random intercept and repetition slope
    pub diastolic_slope: MixedFit,
    /// 5: both types, random intercept only
    pub pooled_intercept: MixedFit,
    /// 6: per-type random effect with a common variance
    pub pooled_vc_common: MixedFit,
    /// 7: per-type random effects with separate variances
    pub pooled_vc_split: MixedFit,
    /// 8: as 7 with heteroscedasticity across diastolic repetitions
    pub pooled_vc_hetero: MixedFit,
}

/// Run the eight-fit sequence over the long table
///
/// The mixed models use only the first `fit_row_limit` rows of their
/// input, as the published analysis does to keep fitting interactive;
/// the OLS fit uses every row.
///
/// # Errors
/// Any failed fit aborts the sequence with a propagated error
pub fn run(dx: &RecordBatch, fit_row_limit: usize) -> Result<AnalysisReport> {
    log::info!("Fit 1: pooled OLS, both measurement types");
    let ols_pooled = Ols::from_formula(POOLED_FORMULA, dx)?.fit()?;
    log::info!("{}", ols_pooled.summary());

    let systolic = head(&filter_eq_utf8(dx, "bpt", "SY")?, fit_row_limit);
    log::info!(
        "Fit 2: systolic only, random intercept ({} rows)",
        systolic.num_rows()
    );
    let systolic_intercept =
        MixedModel::from_formula(SINGLE_TYPE_FORMULA, SUBJECT_KEY, &systolic)?.fit()?;
    let systolic_icc = systolic_intercept.icc();
    log::info!("{}", systolic_intercept.summary());
    log::info!("Systolic ICC: {systolic_icc:.4}");

    let diastolic = head(&filter_eq_utf8(dx, "bpt", "DI")?, fit_row_limit);
    log::info!(
        "Fit 3: diastolic only, random intercept ({} rows)",
        diastolic.num_rows()
    );
    let diastolic_intercept =
        MixedModel::from_formula(SINGLE_TYPE_FORMULA, SUBJECT_KEY, &diastolic)?.fit()?;
    let diastolic_icc = diastolic_intercept.icc();
    log::info!("{}", diastolic_intercept.summary());
    log::info!("Diastolic ICC: {diastolic_icc:.4}");

    log::info!("Fit 4: diastolic only, random intercept and repetition slope");
    let diastolic_slope =
        MixedModel::from_formula("bp ~ RIDAGEYR + female + BMXBMI + bpi", SUBJECT_KEY, &diastolic)?
            .re_formula("1 + bpi")?
            .fit()?;
    log::info!("{}", diastolic_slope.summary());

    let pooled = head(dx, fit_row_limit);
    log::info!(
        "Fit 5: both types, random intercept ({} rows)",
        pooled.num_rows()
    );
    let pooled_intercept = MixedModel::from_formula(POOLED_FORMULA, SUBJECT_KEY, &pooled)?.fit()?;
    log::info!("{}", pooled_intercept.summary());

    log::info!("Fit 6: both types, per-type random effect with common variance");
    let pooled_vc_common = MixedModel::from_formula(POOLED_FORMULA, SUBJECT_KEY, &pooled)?
        .re_formula("1")?
        .vc_formula("bpt", "0 + C(bpt)")?
        .fit()?;
    log::info!("{}", pooled_vc_common.summary());

    log::info!("Fit 7: both types, per-type random effects with separate variances");
    let pooled_vc_split = MixedModel::from_formula(POOLED_FORMULA, SUBJECT_KEY, &pooled)?
        .re_formula("1")?
        .vc_formula("sy", "0 + sy")?
        .vc_formula("di", "0 + di")?
        .fit()?;
    log::info!("{}", pooled_vc_split.summary());

    log::info!("Fit 8: adding heteroscedasticity across diastolic repetitions");
    let pooled_vc_hetero = MixedModel::from_formula(POOLED_FORMULA, SUBJECT_KEY, &pooled)?
        .re_formula("1")?
        .vc_formula("sy", "0 + sy")?
        .vc_formula("di", "0 + di")?
        .vc_formula("dye", "0 + di1 + di2 + di3")?
        .fit()?;
    log::info!("{}", pooled_vc_hetero.summary());

    Ok(AnalysisReport {
        ols_pooled,
        systolic_intercept,
        systolic_icc,
        diastolic_intercept,
        diastolic_icc,
        diastolic_slope,
        pooled_intercept,
        pooled_vc_common,
        pooled_vc_split,
        pooled_vc_hetero,
    })
}
