//! End-to-end run of the eight-fit sequence over a synthetic cohort with a
//! known variance decomposition.

use std::sync::Arc;

use arrow::array::Float64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use nhanes_bp::analysis;
use nhanes_bp::reshape::long_table;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// A merged wide table in the shape the joins produce: subject attributes
/// plus the eight repeated blood-pressure columns, with the fourth
/// repetition missing for every third subject.
fn synthetic_cohort(subjects: usize) -> RecordBatch {
    let mut rng = StdRng::seed_from_u64(20112012);

    let mut seqn = Vec::new();
    let mut age = Vec::new();
    let mut gender = Vec::new();
    let mut bmi = Vec::new();
    let mut sy: Vec<Vec<Option<f64>>> = vec![Vec::new(); 4];
    let mut di: Vec<Vec<Option<f64>>> = vec![Vec::new(); 4];

    for s in 0..subjects {
        let age_v = rng.random_range(20.0..75.0);
        let female = f64::from(u8::from(s % 2 == 0));
        let bmi_v = rng.random_range(19.0..36.0);
        seqn.push(s as f64 + 1.0);
        age.push(age_v);
        gender.push(if female == 1.0 { 2.0 } else { 1.0 });
        bmi.push(bmi_v);

        // Subject level, per-type level, and residual variation.
        let subject = 3.0 * normal(&mut rng);
        let type_sy = 2.0 * normal(&mut rng);
        let type_di = 2.0 * normal(&mut rng);
        let mean_sy = 95.0 + 0.35 * age_v - 2.0 * female + 0.4 * bmi_v + subject + type_sy;
        let mean_di = 60.0 + 0.10 * age_v - 1.0 * female + 0.2 * bmi_v + subject + type_di;

        for rep in 0..4 {
            let observed = rep < 3 || s % 3 != 0;
            sy[rep].push(observed.then(|| mean_sy + 2.0 * normal(&mut rng)));
            di[rep].push(observed.then(|| mean_di + 2.0 * normal(&mut rng)));
        }
    }

    let mut fields = vec![
        Field::new("SEQN", DataType::Float64, true),
        Field::new("RIDAGEYR", DataType::Float64, true),
        Field::new("RIAGENDR", DataType::Float64, true),
        Field::new("BMXBMI", DataType::Float64, true),
    ];
    let mut columns: Vec<arrow::array::ArrayRef> = vec![
        Arc::new(Float64Array::from(seqn)),
        Arc::new(Float64Array::from(age)),
        Arc::new(Float64Array::from(gender)),
        Arc::new(Float64Array::from(bmi)),
    ];
    for (rep, values) in sy.into_iter().enumerate() {
        fields.push(Field::new(format!("BPXSY{}", rep + 1), DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(values)));
    }
    for (rep, values) in di.into_iter().enumerate() {
        fields.push(Field::new(format!("BPXDI{}", rep + 1), DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(values)));
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
}

#[test]
fn full_model_sequence_runs_on_synthetic_cohort() {
    let subjects = 150;
    let wide = synthetic_cohort(subjects);
    let dx = long_table(&wide).unwrap();

    // Every third subject loses two readings to missingness.
    let missing = 2 * subjects.div_ceil(3);
    assert_eq!(dx.num_rows(), subjects * 8 - missing);

    let report = analysis::run(&dx, 5000).unwrap();

    // The pooled OLS sees the systolic/diastolic gap.
    let bpt_idx = report
        .ols_pooled
        .names
        .iter()
        .position(|n| n == "C(bpt)[T.SY]")
        .unwrap();
    assert!(report.ols_pooled.params[bpt_idx] > 20.0);

    // Repeated readings of the same subject and type are strongly
    // correlated: true ICC is (9 + 4) / (9 + 4 + 4).
    assert!(report.systolic_icc > 0.5 && report.systolic_icc < 0.95);
    assert!(report.diastolic_icc > 0.5 && report.diastolic_icc < 0.95);

    // The split-variance model finds per-type variation on both sides.
    assert_eq!(report.pooled_vc_split.vc.len(), 2);
    for (_, var) in &report.pooled_vc_split.vc {
        assert!(*var > 0.0);
    }

    // The random-slope fit carries a 2x2 covariance.
    assert_eq!(report.diastolic_slope.cov_re.nrows(), 2);

    // The heteroscedastic model reports all three named components.
    let names: Vec<&str> = report
        .pooled_vc_hetero
        .vc
        .iter()
        .map(|(n, _)| n.as_str())
        .collect();
    assert_eq!(names, vec!["sy", "di", "dye"]);
}
