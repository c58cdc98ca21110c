//! # Threshold-Sweep AUROC / AUPRC
//!
//! For each class the curve is evaluated exactly at the distinct observed scores,
//! so there is no grid and no interpolation error. The sweep:
//!
//! 1. Thresholds are the distinct scores in descending order, preceded by a
//!    sentinel `max + 1` at which nothing is predicted positive.
//! 2. Record indices are sorted once by descending score.
//! 3. A single cursor walks that order while the thresholds decrease. Every
//!    record whose score is `>=` the current threshold moves FN -> TP (positive)
//!    or TN -> FP (negative). Records are absorbed exactly once, so the sweep is
//!    linear after the `O(R log R)` sort, and tied scores land in one step.
//!
//! AUROC integrates TNR over TPR with the trapezoidal rule; AUPRC integrates PPV
//! over TPR with a right-endpoint step rule. Undefined rates are NaN and the NaN
//! is carried into the class's area.

use crate::types::{InputError, check_finite_scores, check_shape, nan_mean};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

/// Confusion counts of one class at every threshold of the sweep.
///
/// Index 0 is the sentinel threshold (nothing predicted positive); the last index
/// is the minimum observed score (everything predicted positive).
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSweep {
    pub thresholds: Vec<f64>,
    pub true_positives: Vec<usize>,
    pub false_positives: Vec<usize>,
    pub false_negatives: Vec<usize>,
    pub true_negatives: Vec<usize>,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ThresholdSweep {
    /// Runs the sweep for one class. `labels` and `scores` must have equal length
    /// and every score must be finite; [`compute_auc`] checks both and reports
    /// violations as errors.
    pub fn compute(labels: ArrayView1<'_, bool>, scores: ArrayView1<'_, f64>) -> Self {
        assert_eq!(
            labels.len(),
            scores.len(),
            "Labels and scores must have the same length."
        );
        assert!(
            scores.iter().all(|s| s.is_finite()),
            "Scores must be finite."
        );
        let num_records = scores.len();

        let mut distinct: Vec<f64> = scores.to_vec();
        distinct.sort_unstable_by(|a, b| b.total_cmp(a));
        distinct.dedup();

        let mut thresholds = Vec::with_capacity(distinct.len() + 1);
        thresholds.push(distinct.first().map_or(1.0, |&max| max + 1.0));
        thresholds.extend(distinct);

        let mut order: Vec<usize> = (0..num_records).collect();
        order.sort_unstable_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let positives = labels.iter().filter(|&&l| l).count();
        let (mut tp, mut fp) = (0usize, 0usize);
        let (mut fn_, mut tn) = (positives, num_records - positives);

        let steps = thresholds.len();
        let mut sweep = Self {
            true_positives: Vec::with_capacity(steps),
            false_positives: Vec::with_capacity(steps),
            false_negatives: Vec::with_capacity(steps),
            true_negatives: Vec::with_capacity(steps),
            thresholds,
        };
        sweep.record(tp, fp, fn_, tn);

        let mut cursor = 0;
        for step in 1..steps {
            let threshold = sweep.thresholds[step];
            while cursor < num_records && scores[order[cursor]] >= threshold {
                if labels[order[cursor]] {
                    tp += 1;
                    fn_ -= 1;
                } else {
                    fp += 1;
                    tn -= 1;
                }
                cursor += 1;
            }
            sweep.record(tp, fp, fn_, tn);
        }

        sweep
    }

    fn record(&mut self, tp: usize, fp: usize, fn_: usize, tn: usize) {
        self.true_positives.push(tp);
        self.false_positives.push(fp);
        self.false_negatives.push(fn_);
        self.true_negatives.push(tn);
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Sensitivity `TP / (TP + FN)` per threshold.
    pub fn tpr(&self) -> Vec<f64> {
        self.true_positives
            .iter()
            .zip(&self.false_negatives)
            .map(|(&tp, &fn_)| ratio(tp, tp + fn_))
            .collect()
    }

    /// Specificity `TN / (FP + TN)` per threshold.
    pub fn tnr(&self) -> Vec<f64> {
        self.true_negatives
            .iter()
            .zip(&self.false_positives)
            .map(|(&tn, &fp)| ratio(tn, fp + tn))
            .collect()
    }

    /// Precision `TP / (TP + FP)` per threshold.
    pub fn ppv(&self) -> Vec<f64> {
        self.true_positives
            .iter()
            .zip(&self.false_positives)
            .map(|(&tp, &fp)| ratio(tp, tp + fp))
            .collect()
    }

    /// Area under the TPR (x) / TNR (y) curve, trapezoidal rule.
    pub fn auroc(&self) -> f64 {
        let tpr = self.tpr();
        let tnr = self.tnr();
        tpr.windows(2)
            .zip(tnr.windows(2))
            .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[1] + y[0]))
            .sum()
    }

    /// Area under the TPR (x) / PPV (y) curve, right-endpoint step rule.
    pub fn auprc(&self) -> f64 {
        let tpr = self.tpr();
        let ppv = self.ppv();
        tpr.windows(2)
            .zip(ppv.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * y[1])
            .sum()
    }
}

/// Per-class and macro-averaged ranking metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingMetrics {
    pub macro_auroc: f64,
    pub macro_auprc: f64,
    pub auroc: Array1<f64>,
    pub auprc: Array1<f64>,
}

fn class_areas(class: usize, labels: ArrayView1<'_, bool>, scores: ArrayView1<'_, f64>) -> (f64, f64) {
    let sweep = ThresholdSweep::compute(labels, scores);
    let (auroc, auprc) = (sweep.auroc(), sweep.auprc());
    if auroc.is_nan() || auprc.is_nan() {
        log::debug!(
            "Class #{class}: ranking metrics undefined (AUROC={auroc}, AUPRC={auprc}); positives={}, records={}",
            sweep.false_negatives[0],
            labels.len()
        );
    }
    (auroc, auprc)
}

/// Computes AUROC and AUPRC for every class, plus their NaN-ignoring macro means.
///
/// With `parallel` set, classes are swept on the rayon pool; results are always
/// returned in class order.
pub fn compute_auc(
    labels: ArrayView2<'_, bool>,
    scores: ArrayView2<'_, f64>,
    parallel: bool,
) -> Result<RankingMetrics, InputError> {
    check_shape(scores, "scalar_pred", labels.dim())?;
    check_finite_scores(scores)?;

    let areas: Vec<(f64, f64)> = if parallel {
        labels
            .axis_iter(Axis(1))
            .into_par_iter()
            .zip(scores.axis_iter(Axis(1)).into_par_iter())
            .enumerate()
            .map(|(class, (l, s))| class_areas(class, l, s))
            .collect()
    } else {
        labels
            .axis_iter(Axis(1))
            .zip(scores.axis_iter(Axis(1)))
            .enumerate()
            .map(|(class, (l, s))| class_areas(class, l, s))
            .collect()
    };

    let auroc: Array1<f64> = areas.iter().map(|&(roc, _)| roc).collect();
    let auprc: Array1<f64> = areas.iter().map(|&(_, pr)| pr).collect();

    Ok(RankingMetrics {
        macro_auroc: nan_mean(auroc.view()),
        macro_auprc: nan_mean(auprc.view()),
        auroc,
        auprc,
    })
}
