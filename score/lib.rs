#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

//! Scoring engine for multi-label diagnostic classifiers: threshold-sweep
//! AUROC/AUPRC, the F-measure family and the severity-weighted challenge score.

pub mod challenge;
pub mod config;
pub mod confusion;
pub mod metrics;
pub mod modified;
pub mod progress;
pub mod ranking;
pub mod set_metrics;
pub mod types;

#[path = "../weights/mod.rs"]
pub mod weights;

#[path = "../data/mod.rs"]
pub mod data;

pub use config::EvaluationConfig;
pub use metrics::{
    DetailedMetrics, MetricsError, SummaryMetrics, WeightSource, evaluate_detailed,
    evaluate_summary,
};
pub use types::{ClassList, EvaluationInputs, InputError};
