use log::{info, warn};
use nhanes_bp::reshape::{SUBJECT_KEY, inner_join, long_table};
use nhanes_bp::{
    AnalysisConfig, BmxSurvey, BpxSurvey, DemoSurvey, Result, SurveyLoader, analysis,
    concat_batches,
};
use std::time::Instant;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AnalysisConfig::default();
    if !config.data_dir.exists() {
        warn!("Data directory not found: {}", config.data_dir.display());
        return Ok(());
    }

    info!("Loading survey extracts from: {}", config.data_dir.display());
    let start = Instant::now();

    let demo = DemoSurvey::new();
    let bpx = BpxSurvey::new();
    let bmx = BmxSurvey::new();
    let demo_batches = demo.load(&config.data_dir.join("DEMO_G.parquet"))?;
    let bpx_batches = bpx.load(&config.data_dir.join("BPX_G.parquet"))?;
    let bmx_batches = bmx.load(&config.data_dir.join("BMX_G.parquet"))?;

    let demo_table = concat_batches(&demo_batches)?;
    let bpx_table = concat_batches(&bpx_batches)?;
    let bmx_table = concat_batches(&bmx_batches)?;
    info!(
        "Loaded DEMO ({} rows), BPX ({} rows), BMX ({} rows) in {:?}",
        demo_table.num_rows(),
        bpx_table.num_rows(),
        bmx_table.num_rows(),
        start.elapsed()
    );

    // Merge the extracts on the subject key, then reshape to long form.
    let merged = inner_join(&demo_table, &bpx_table, SUBJECT_KEY)?;
    let merged = inner_join(&merged, &bmx_table, SUBJECT_KEY)?;
    let dx = long_table(&merged)?;
    info!(
        "Reshaped {} merged subjects into {} long-format measurement rows",
        merged.num_rows(),
        dx.num_rows()
    );

    let report = analysis::run(&dx, config.fit_row_limit)?;
    info!(
        "All fits complete; systolic ICC {:.4}, diastolic ICC {:.4}",
        report.systolic_icc, report.diastolic_icc
    );

    Ok(())
}
