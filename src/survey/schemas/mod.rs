//! Arrow schema definitions for the survey extracts
//!
//! The source files are SAS transport conversions, so every column arrives
//! as a nullable Float64 regardless of its logical type; SEQN included. The
//! reshape step coerces SEQN to an integer key after joining.

pub mod bmx;
pub mod bpx;
pub mod demo;

pub use bmx::bmx_schema;
pub use bpx::bpx_schema;
pub use demo::demo_schema;

/// Systolic repeated-measure column names, in repetition order
pub const SYSTOLIC_COLUMNS: [&str; 4] = ["BPXSY1", "BPXSY2", "BPXSY3", "BPXSY4"];

/// Diastolic repeated-measure column names, in repetition order
pub const DIASTOLIC_COLUMNS: [&str; 4] = ["BPXDI1", "BPXDI2", "BPXDI3", "BPXDI4"];
