//! # Evaluation Entry Points
//!
//! Runs every metric of the crate over one set of [`EvaluationInputs`]. All
//! configuration problems are detected up front, before any metric is computed:
//! the configuration itself is validated, the default class must be part of the
//! class list, and the weight matrix is resolved and shape-checked.
//!
//! [`evaluate_detailed`] returns the per-class arrays alongside the macro values;
//! [`evaluate_summary`] reduces the same computation to the scalar subset.

use crate::challenge::{ChallengeBreakdown, ChallengeError, challenge_breakdown};
use crate::config::{ConfigError, EvaluationConfig};
use crate::progress::{EvaluationProgressObserver, EvaluationStage};
use crate::ranking::compute_auc;
use crate::set_metrics::{accuracy, beta_measures, f_measure};
use crate::types::{ClassList, EvaluationInputs, InputError, check_weight_shape};
use crate::weights::{WeightError, WeightTable};
use itertools::izip;
use ndarray::{Array1, Array2, ArrayView2};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    Weights(#[from] WeightError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to write report: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to serialize report to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Where the class-to-class weights come from.
#[derive(Debug, Clone, Copy)]
pub enum WeightSource<'a> {
    /// A matrix already aligned with the class list.
    Matrix(ArrayView2<'a, f64>),
    /// A weight table keyed by class identifier.
    Table(&'a WeightTable),
}

impl WeightSource<'_> {
    /// The `C x C` matrix aligned with `classes`.
    pub fn resolve(&self, classes: &ClassList) -> Result<Array2<f64>, MetricsError> {
        let weights = match self {
            Self::Matrix(matrix) => matrix.to_owned(),
            Self::Table(table) => table.select(classes)?,
        };
        check_weight_shape(weights.view(), classes.len())?;
        Ok(weights)
    }
}

/// Every metric of one evaluation, per class where applicable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedMetrics {
    pub classes: Vec<String>,
    pub macro_auroc: f64,
    pub macro_auprc: f64,
    pub auroc: Array1<f64>,
    pub auprc: Array1<f64>,
    pub accuracy: f64,
    pub macro_f_measure: f64,
    pub f_measure: Array1<f64>,
    pub beta: f64,
    pub macro_f_beta: f64,
    pub macro_g_beta: f64,
    pub f_beta: Array1<f64>,
    pub g_beta: Array1<f64>,
    pub challenge_metric: f64,
    pub challenge: ChallengeBreakdown,
}

/// The scalar metrics of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub macro_auroc: f64,
    pub macro_auprc: f64,
    pub accuracy: f64,
    pub macro_f_measure: f64,
    pub macro_f_beta: f64,
    pub macro_g_beta: f64,
    pub challenge_metric: f64,
}

impl From<&DetailedMetrics> for SummaryMetrics {
    fn from(detailed: &DetailedMetrics) -> Self {
        Self {
            macro_auroc: detailed.macro_auroc,
            macro_auprc: detailed.macro_auprc,
            accuracy: detailed.accuracy,
            macro_f_measure: detailed.macro_f_measure,
            macro_f_beta: detailed.macro_f_beta,
            macro_g_beta: detailed.macro_g_beta,
            challenge_metric: detailed.challenge_metric,
        }
    }
}

impl From<DetailedMetrics> for SummaryMetrics {
    fn from(detailed: DetailedMetrics) -> Self {
        Self::from(&detailed)
    }
}

/// One row of the per-class table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: String,
    pub auroc: f64,
    pub auprc: f64,
    pub f_measure: f64,
    pub f_beta: f64,
    pub g_beta: f64,
}

impl DetailedMetrics {
    pub fn summary(&self) -> SummaryMetrics {
        SummaryMetrics::from(self)
    }

    /// Per-class metrics in class-list order.
    pub fn per_class(&self) -> Vec<ClassMetrics> {
        izip!(
            &self.classes,
            &self.auroc,
            &self.auprc,
            &self.f_measure,
            &self.f_beta,
            &self.g_beta
        )
        .map(|(class, &auroc, &auprc, &f_measure, &f_beta, &g_beta)| ClassMetrics {
            class: class.clone(),
            auroc,
            auprc,
            f_measure,
            f_beta,
            g_beta,
        })
        .collect()
    }
}

/// Report written by the command-line harness.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub num_records: usize,
    pub config: EvaluationConfig,
    pub summary: SummaryMetrics,
    pub challenge: ChallengeBreakdown,
    pub classes: Vec<ClassMetrics>,
}

impl EvaluationReport {
    pub fn new(config: &EvaluationConfig, num_records: usize, detailed: &DetailedMetrics) -> Self {
        Self {
            num_records,
            config: config.clone(),
            summary: detailed.summary(),
            challenge: detailed.challenge,
            classes: detailed.per_class(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MetricsError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }
}

/// Computes every metric, reporting each stage to `progress`.
pub fn evaluate_detailed(
    inputs: &EvaluationInputs,
    weights: WeightSource<'_>,
    config: &EvaluationConfig,
    progress: &mut dyn EvaluationProgressObserver,
) -> Result<DetailedMetrics, MetricsError> {
    config.validate()?;
    let classes = &inputs.classes;
    if classes.position(&config.default_class).is_none() {
        return Err(ChallengeError::MissingDefaultClass(config.default_class.clone()).into());
    }
    let weights = weights.resolve(classes)?;

    let num_classes = inputs.num_classes();
    let truth = inputs.truth.view();
    let binary = inputs.binary.view();
    log::debug!(
        "Evaluating {} records x {num_classes} classes (parallel: {})",
        inputs.num_records(),
        config.parallel
    );

    progress.on_stage_start(EvaluationStage::Ranking, num_classes);
    let ranking = compute_auc(truth, inputs.scalar.view(), config.parallel)?;
    progress.on_stage_finish(EvaluationStage::Ranking);

    progress.on_stage_start(EvaluationStage::Accuracy, num_classes);
    let accuracy = accuracy(truth, binary)?;
    progress.on_stage_finish(EvaluationStage::Accuracy);

    progress.on_stage_start(EvaluationStage::FMeasure, num_classes);
    let f1 = f_measure(truth, binary)?;
    progress.on_stage_finish(EvaluationStage::FMeasure);

    progress.on_stage_start(EvaluationStage::BetaMeasures, num_classes);
    let beta = beta_measures(truth, binary, config.beta)?;
    progress.on_stage_finish(EvaluationStage::BetaMeasures);

    progress.on_stage_start(EvaluationStage::Challenge, num_classes);
    let challenge = challenge_breakdown(
        weights.view(),
        truth,
        binary,
        classes,
        &config.default_class,
    )?;
    progress.on_stage_finish(EvaluationStage::Challenge);
    progress.on_evaluation_finish();

    Ok(DetailedMetrics {
        classes: classes.names().to_vec(),
        macro_auroc: ranking.macro_auroc,
        macro_auprc: ranking.macro_auprc,
        auroc: ranking.auroc,
        auprc: ranking.auprc,
        accuracy,
        macro_f_measure: f1.macro_f_measure,
        f_measure: f1.per_class,
        beta: beta.beta,
        macro_f_beta: beta.macro_f_beta,
        macro_g_beta: beta.macro_g_beta,
        f_beta: beta.f_beta,
        g_beta: beta.g_beta,
        challenge_metric: challenge.score,
        challenge,
    })
}

/// The scalar subset of [`evaluate_detailed`].
pub fn evaluate_summary(
    inputs: &EvaluationInputs,
    weights: WeightSource<'_>,
    config: &EvaluationConfig,
    progress: &mut dyn EvaluationProgressObserver,
) -> Result<SummaryMetrics, MetricsError> {
    evaluate_detailed(inputs, weights, config, progress).map(SummaryMetrics::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use tempfile::tempdir;

    fn scenario() -> EvaluationInputs {
        EvaluationInputs::new(
            ClassList::new(["N", "A"]).unwrap(),
            array![[true, false], [false, true]],
            array![[true, false], [true, false]],
            array![[0.9, 0.1], [0.6, 0.4]],
        )
        .unwrap()
    }

    fn config(default_class: &str) -> EvaluationConfig {
        EvaluationConfig {
            default_class: default_class.to_string(),
            ..EvaluationConfig::default()
        }
    }

    #[derive(Default)]
    struct StageRecorder {
        stages: Vec<EvaluationStage>,
        finished: bool,
    }

    impl EvaluationProgressObserver for StageRecorder {
        fn on_stage_start(&mut self, stage: EvaluationStage, num_classes: usize) {
            assert_eq!(num_classes, 2);
            self.stages.push(stage);
        }
        fn on_evaluation_finish(&mut self) {
            self.finished = true;
        }
    }

    #[test]
    fn two_class_scenario() {
        let weights = array![[1.0, 0.5], [0.5, 1.0]];
        let detailed = evaluate_detailed(
            &scenario(),
            WeightSource::Matrix(weights.view()),
            &config("N"),
            &mut NoopProgress,
        )
        .unwrap();

        // N: TP = 1, FP = 1. A: FN = 1, TN = 1.
        assert_abs_diff_eq!(detailed.f_measure[0], 2.0 / 3.0);
        assert_abs_diff_eq!(detailed.f_measure[1], 0.0);
        assert_abs_diff_eq!(detailed.macro_f_measure, 1.0 / 3.0);
        assert_abs_diff_eq!(detailed.accuracy, 0.5);

        // Both classes rank their single positive first.
        assert_eq!(detailed.auroc, array![1.0, 1.0]);
        assert_eq!(detailed.auprc, array![1.0, 1.0]);

        assert_abs_diff_eq!(detailed.f_beta[0], 5.0 / 6.0);
        assert_abs_diff_eq!(detailed.g_beta[0], 0.5);
        assert_abs_diff_eq!(detailed.macro_f_beta, 5.0 / 12.0);
        assert_abs_diff_eq!(detailed.macro_g_beta, 0.25);

        // The binary outputs coincide with the default-class classifier.
        assert_abs_diff_eq!(detailed.challenge.observed, 1.25);
        assert_abs_diff_eq!(detailed.challenge.perfect, 2.0);
        assert_abs_diff_eq!(detailed.challenge_metric, 0.0);
    }

    #[test]
    fn summary_is_the_scalar_subset() {
        let weights = Array2::<f64>::eye(2);
        let detailed = evaluate_detailed(
            &scenario(),
            WeightSource::Matrix(weights.view()),
            &config("N"),
            &mut NoopProgress,
        )
        .unwrap();
        let summary = evaluate_summary(
            &scenario(),
            WeightSource::Matrix(weights.view()),
            &config("N"),
            &mut NoopProgress,
        )
        .unwrap();
        assert_eq!(summary, detailed.summary());
        assert_eq!(summary.macro_auroc, detailed.macro_auroc);
        assert_eq!(summary.challenge_metric, detailed.challenge_metric);
    }

    #[test]
    fn stages_are_reported_in_order() {
        let weights = Array2::<f64>::eye(2);
        let mut recorder = StageRecorder::default();
        evaluate_detailed(
            &scenario(),
            WeightSource::Matrix(weights.view()),
            &config("N"),
            &mut recorder,
        )
        .unwrap();
        assert_eq!(
            recorder.stages,
            vec![
                EvaluationStage::Ranking,
                EvaluationStage::Accuracy,
                EvaluationStage::FMeasure,
                EvaluationStage::BetaMeasures,
                EvaluationStage::Challenge,
            ]
        );
        assert!(recorder.finished);
    }

    #[test]
    fn missing_default_class_fails_before_any_stage() {
        let weights = Array2::<f64>::eye(2);
        let mut recorder = StageRecorder::default();
        let err = evaluate_detailed(
            &scenario(),
            WeightSource::Matrix(weights.view()),
            &EvaluationConfig::default(),
            &mut recorder,
        )
        .unwrap_err();
        match err {
            MetricsError::Challenge(ChallengeError::MissingDefaultClass(class)) => {
                assert_eq!(class, "NSR")
            }
            other => panic!("Expected MissingDefaultClass, got {other:?}"),
        }
        assert!(recorder.stages.is_empty());
    }

    #[test]
    fn weight_table_lookup_failure_is_fatal() {
        let table =
            WeightTable::from_parts(vec!["N".to_string(), "V".to_string()], Array2::eye(2))
                .unwrap();
        let mut recorder = StageRecorder::default();
        let err = evaluate_detailed(
            &scenario(),
            WeightSource::Table(&table),
            &config("N"),
            &mut recorder,
        )
        .unwrap_err();
        match err {
            MetricsError::Weights(WeightError::MissingClasses(missing)) => {
                assert_eq!(missing, vec!["A"])
            }
            other => panic!("Expected MissingClasses, got {other:?}"),
        }
        assert!(recorder.stages.is_empty());
    }

    #[test]
    fn weight_table_is_aligned_by_identifier() {
        let table = WeightTable::from_parts(
            vec!["A|AF".to_string(), "N".to_string()],
            array![[1.0, 0.5], [0.5, 1.0]],
        )
        .unwrap();
        let matrix = array![[1.0, 0.5], [0.5, 1.0]];
        let from_table = evaluate_detailed(
            &scenario(),
            WeightSource::Table(&table),
            &config("N"),
            &mut NoopProgress,
        )
        .unwrap();
        let from_matrix = evaluate_detailed(
            &scenario(),
            WeightSource::Matrix(matrix.view()),
            &config("N"),
            &mut NoopProgress,
        )
        .unwrap();
        assert_eq!(from_table.challenge, from_matrix.challenge);
    }

    #[test]
    fn wrong_weight_shape_is_rejected() {
        let weights = Array2::<f64>::eye(3);
        assert!(matches!(
            evaluate_summary(
                &scenario(),
                WeightSource::Matrix(weights.view()),
                &config("N"),
                &mut NoopProgress,
            ),
            Err(MetricsError::Input(InputError::WeightShape { expected: 2, .. }))
        ));
    }

    #[test]
    fn invalid_beta_is_rejected() {
        let weights = Array2::<f64>::eye(2);
        let config = EvaluationConfig {
            beta: 0.0,
            ..config("N")
        };
        assert!(matches!(
            evaluate_summary(
                &scenario(),
                WeightSource::Matrix(weights.view()),
                &config,
                &mut NoopProgress,
            ),
            Err(MetricsError::Config(ConfigError::InvalidBeta(_)))
        ));
    }

    #[test]
    fn per_class_rows_follow_class_order() {
        let weights = Array2::<f64>::eye(2);
        let detailed = evaluate_detailed(
            &scenario(),
            WeightSource::Matrix(weights.view()),
            &config("N"),
            &mut NoopProgress,
        )
        .unwrap();
        let rows = detailed.per_class();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].class, "N");
        assert_eq!(rows[1].class, "A");
        assert_abs_diff_eq!(rows[0].f_measure, 2.0 / 3.0);
    }

    #[test]
    fn report_is_written_as_toml() {
        let weights = Array2::<f64>::eye(2);
        let config = config("N");
        let detailed = evaluate_detailed(
            &scenario(),
            WeightSource::Matrix(weights.view()),
            &config,
            &mut NoopProgress,
        )
        .unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.toml");
        EvaluationReport::new(&config, 2, &detailed)
            .save(&path)
            .unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("challenge_metric"));
        assert!(written.contains("[[classes]]"));
    }
}
