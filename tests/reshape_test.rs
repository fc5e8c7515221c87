//! Reshaping properties: unpivot row counts, derived columns, missing-value
//! handling and join semantics over small synthetic extracts.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use nhanes_bp::reshape::{
    SUBJECT_KEY, VALUE_COLUMN, VAR_COLUMN, cast_column_to_int, derive_indicators, drop_missing,
    filter_eq_utf8, inner_join, melt, sort_by,
};
use nhanes_bp::utils::arrow::{f64_values, i64_values, utf8_column};

/// A wide table of three subjects with two repeated columns per
/// measurement type and a few deliberately missing readings.
fn wide_fixture() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("SEQN", DataType::Float64, true),
        Field::new("RIDAGEYR", DataType::Float64, true),
        Field::new("RIAGENDR", DataType::Float64, true),
        Field::new("BMXBMI", DataType::Float64, true),
        Field::new("BPXSY1", DataType::Float64, true),
        Field::new("BPXSY2", DataType::Float64, true),
        Field::new("BPXDI1", DataType::Float64, true),
        Field::new("BPXDI2", DataType::Float64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(vec![3.0, 1.0, 2.0])),
            Arc::new(Float64Array::from(vec![44.0, 61.0, 35.0])),
            Arc::new(Float64Array::from(vec![2.0, 1.0, 2.0])),
            Arc::new(Float64Array::from(vec![27.1, 31.4, 22.9])),
            Arc::new(Float64Array::from(vec![Some(118.0), Some(141.0), Some(109.0)])),
            Arc::new(Float64Array::from(vec![Some(120.0), None, Some(111.0)])),
            Arc::new(Float64Array::from(vec![Some(72.0), Some(85.0), None])),
            Arc::new(Float64Array::from(vec![Some(74.0), Some(83.0), Some(66.0)])),
        ],
    )
    .unwrap()
}

const WIDE_VALUE_VARS: [&str; 4] = ["BPXSY1", "BPXSY2", "BPXDI1", "BPXDI2"];
const WIDE_ID_VARS: [&str; 4] = ["SEQN", "RIDAGEYR", "RIAGENDR", "BMXBMI"];

fn long_fixture() -> RecordBatch {
    let wide = wide_fixture();
    let dx = melt(&wide, &WIDE_ID_VARS, &WIDE_VALUE_VARS, VAR_COLUMN, VALUE_COLUMN).unwrap();
    let dx = sort_by(&dx, SUBJECT_KEY).unwrap();
    let dx = cast_column_to_int(&dx, SUBJECT_KEY).unwrap();
    let dx = drop_missing(&dx).unwrap();
    derive_indicators(&dx).unwrap()
}

#[test]
fn melt_produces_subjects_times_value_columns_rows() {
    let wide = wide_fixture();
    let dx = melt(&wide, &WIDE_ID_VARS, &WIDE_VALUE_VARS, VAR_COLUMN, VALUE_COLUMN).unwrap();

    // Before missing-value removal: one row per (subject, value column).
    assert_eq!(dx.num_rows(), wide.num_rows() * WIDE_VALUE_VARS.len());
    // Id columns broadcast, variable and value columns appended.
    assert_eq!(dx.num_columns(), WIDE_ID_VARS.len() + 2);
}

#[test]
fn melt_rejects_missing_columns() {
    let wide = wide_fixture();
    assert!(melt(&wide, &["nope"], &WIDE_VALUE_VARS, VAR_COLUMN, VALUE_COLUMN).is_err());
    assert!(melt(&wide, &WIDE_ID_VARS, &["BPXSY9"], VAR_COLUMN, VALUE_COLUMN).is_err());
}

#[test]
fn derived_columns_have_expected_domains() {
    let dx = long_fixture();

    let bpt = utf8_column(&dx, "bpt").unwrap();
    for i in 0..bpt.len() {
        assert!(matches!(bpt.value(i), "SY" | "DI"));
    }

    for bpi in i64_values(&dx, "bpi").unwrap() {
        assert!((1..=4).contains(&bpi));
    }
}

#[test]
fn drop_missing_is_idempotent() {
    let wide = wide_fixture();
    let dx = melt(&wide, &WIDE_ID_VARS, &WIDE_VALUE_VARS, VAR_COLUMN, VALUE_COLUMN).unwrap();

    let once = drop_missing(&dx).unwrap();
    let twice = drop_missing(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn female_indicator_matches_sex_code() {
    let dx = long_fixture();
    let gender = f64_values(&dx, "RIAGENDR").unwrap();
    let female = i64_values(&dx, "female").unwrap();
    for (code, indicator) in gender.iter().zip(&female) {
        assert_eq!(*indicator == 1, *code == 2.0);
        assert!(matches!(indicator, 0 | 1));
    }
}

#[test]
fn type_indicators_partition_the_rows() {
    let dx = long_fixture();
    let sy = i64_values(&dx, "sy").unwrap();
    let di = i64_values(&dx, "di").unwrap();
    for (s, d) in sy.iter().zip(&di) {
        assert_eq!(s + d, 1);
    }
}

#[test]
fn end_to_end_scenario_three_subjects() {
    let dx = long_fixture();

    // 3 subjects x 4 measurement columns, minus 2 missing readings.
    assert_eq!(dx.num_rows(), 3 * 4 - 2);

    // Sorted by subject after the cleanup pass.
    let seqn = i64_values(&dx, SUBJECT_KEY).unwrap();
    assert!(seqn.windows(2).all(|w| w[0] <= w[1]));

    // Every (subject, type, repetition) key occurs at most once.
    let bpt = utf8_column(&dx, "bpt").unwrap();
    let bpi = i64_values(&dx, "bpi").unwrap();
    let keys: HashSet<(i64, String, i64)> = (0..dx.num_rows())
        .map(|i| (seqn[i], bpt.value(i).to_string(), bpi[i]))
        .collect();
    assert_eq!(keys.len(), dx.num_rows());

    // The subject with the missing systolic reading contributes 3 rows.
    assert_eq!(seqn.iter().filter(|&&s| s == 1).count(), 3);
}

#[test]
fn filter_eq_selects_one_measurement_type() {
    let dx = long_fixture();
    let systolic = filter_eq_utf8(&dx, "bpt", "SY").unwrap();
    let diastolic = filter_eq_utf8(&dx, "bpt", "DI").unwrap();

    assert_eq!(systolic.num_rows() + diastolic.num_rows(), dx.num_rows());
    let bpt = utf8_column(&systolic, "bpt").unwrap();
    assert!((0..bpt.len()).all(|i| bpt.value(i) == "SY"));
}

fn keyed_batch(name: &str, keys: &[f64], values: &[f64]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("SEQN", DataType::Float64, true),
        Field::new(name, DataType::Float64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(keys.to_vec())),
            Arc::new(Float64Array::from(values.to_vec())),
        ],
    )
    .unwrap()
}

#[test]
fn inner_join_keeps_only_matched_subjects() {
    let left = keyed_batch("a", &[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]);
    let right = keyed_batch("b", &[2.0, 3.0, 4.0], &[200.0, 300.0, 400.0]);

    let joined = inner_join(&left, &right, SUBJECT_KEY).unwrap();
    assert_eq!(joined.num_rows(), 2);
    assert_eq!(joined.num_columns(), 3);
    assert_eq!(f64_values(&joined, "SEQN").unwrap(), vec![2.0, 3.0]);
    assert_eq!(f64_values(&joined, "a").unwrap(), vec![20.0, 30.0]);
    assert_eq!(f64_values(&joined, "b").unwrap(), vec![200.0, 300.0]);
}

#[test]
fn inner_join_with_no_overlap_is_empty() {
    let left = keyed_batch("a", &[1.0, 2.0], &[10.0, 20.0]);
    let right = keyed_batch("b", &[3.0, 4.0], &[300.0, 400.0]);
    let joined = inner_join(&left, &right, SUBJECT_KEY).unwrap();
    assert_eq!(joined.num_rows(), 0);
}

#[test]
fn inner_join_rejects_colliding_column_names() {
    let left = keyed_batch("a", &[1.0], &[10.0]);
    let right = keyed_batch("a", &[1.0], &[11.0]);
    assert!(inner_join(&left, &right, SUBJECT_KEY).is_err());
}

#[test]
fn join_then_reshape_pipeline() {
    let demo = RecordBatch::try_new(
        Arc::new(Schema::new(vec![
            Field::new("SEQN", DataType::Float64, true),
            Field::new("RIDAGEYR", DataType::Float64, true),
            Field::new("RIAGENDR", DataType::Float64, true),
        ])),
        vec![
            Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
            Arc::new(Float64Array::from(vec![61.0, 35.0, 44.0])),
            Arc::new(Float64Array::from(vec![1.0, 2.0, 2.0])),
        ],
    )
    .unwrap();
    // Subject 3 is missing from the body-measures extract and must drop
    // out of the merge silently.
    let bmx = keyed_batch("BMXBMI", &[1.0, 2.0], &[31.4, 22.9]);

    let merged = inner_join(&demo, &bmx, SUBJECT_KEY).unwrap();
    assert_eq!(merged.num_rows(), 2);

    let seqn_int = cast_column_to_int(&merged, SUBJECT_KEY).unwrap();
    assert_eq!(i64_values(&seqn_int, SUBJECT_KEY).unwrap(), vec![1, 2]);
    assert_eq!(
        seqn_int
            .schema()
            .field_with_name(SUBJECT_KEY)
            .unwrap()
            .data_type(),
        &DataType::Int64
    );
}

#[test]
fn derive_rejects_malformed_variable_names() {
    let schema = Arc::new(Schema::new(vec![
        Field::new(VAR_COLUMN, DataType::Utf8, false),
        Field::new("RIAGENDR", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["BPWHAT"])) as _,
            Arc::new(Float64Array::from(vec![1.0])) as _,
        ],
    )
    .unwrap();
    assert!(derive_indicators(&batch).is_err());
}

#[test]
fn per_column_indicators_track_repetition() {
    let dx = long_fixture();
    let sy1 = i64_values(&dx, "sy1").unwrap();
    let bpi = i64_values(&dx, "bpi").unwrap();
    let sy = i64_values(&dx, "sy").unwrap();
    for i in 0..dx.num_rows() {
        assert_eq!(sy1[i] == 1, sy[i] == 1 && bpi[i] == 1);
    }
    // Int64 ids survive the full derivation path.
    let _ = Int64Array::from(i64_values(&dx, SUBJECT_KEY).unwrap());
}
