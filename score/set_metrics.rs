//! Threshold-based metrics derived from the binary predictions: record-level
//! exact-match accuracy, F1, and the F-beta / G-beta pair.

use crate::confusion::{ClassConfusion, Normalization, binary_confusion_matrices};
use crate::types::{InputError, check_shape, nan_mean};
use ndarray::{Array1, Array3, ArrayView2, Axis};

/// Fraction of records whose predicted label set equals the true label set.
pub fn accuracy(
    labels: ArrayView2<'_, bool>,
    outputs: ArrayView2<'_, bool>,
) -> Result<f64, InputError> {
    check_shape(outputs, "binary_pred", labels.dim())?;
    let num_records = labels.nrows();
    if num_records == 0 {
        return Err(InputError::EmptyInput {
            records: 0,
            classes: labels.ncols(),
        });
    }
    let correct = labels
        .axis_iter(Axis(0))
        .zip(outputs.axis_iter(Axis(0)))
        .filter(|(l, o)| l == o)
        .count();
    Ok(correct as f64 / num_records as f64)
}

/// Macro and per-class F1.
#[derive(Debug, Clone, PartialEq)]
pub struct FMeasure {
    pub macro_f_measure: f64,
    pub per_class: Array1<f64>,
}

/// Macro and per-class F-beta and G-beta, computed on per-recording normalized
/// confusion matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaMeasures {
    pub beta: f64,
    pub macro_f_beta: f64,
    pub macro_g_beta: f64,
    pub f_beta: Array1<f64>,
    pub g_beta: Array1<f64>,
}

fn divide_or_nan(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        f64::NAN
    }
}

fn per_class_metric<F>(matrices: &Array3<f64>, metric: F) -> Array1<f64>
where
    F: Fn(ClassConfusion) -> f64,
{
    (0..matrices.len_of(Axis(0)))
        .map(|class| metric(ClassConfusion::from_matrices(matrices, class)))
        .collect()
}

/// `2TP / (2TP + FP + FN)` per class, NaN when the denominator is zero.
pub fn f_measure(
    labels: ArrayView2<'_, bool>,
    outputs: ArrayView2<'_, bool>,
) -> Result<FMeasure, InputError> {
    let matrices = binary_confusion_matrices(labels, outputs, Normalization::Counts)?;
    let per_class = per_class_metric(&matrices, |c| {
        divide_or_nan(
            2.0 * c.true_positive,
            2.0 * c.true_positive + c.false_positive + c.false_negative,
        )
    });
    Ok(FMeasure {
        macro_f_measure: nan_mean(per_class.view()),
        per_class,
    })
}

/// F-beta `(1+b^2)TP / ((1+b^2)TP + FP + b^2 FN)` and G-beta `TP / (TP + FP + b FN)`.
pub fn beta_measures(
    labels: ArrayView2<'_, bool>,
    outputs: ArrayView2<'_, bool>,
    beta: f64,
) -> Result<BetaMeasures, InputError> {
    let matrices = binary_confusion_matrices(labels, outputs, Normalization::PerRecording)?;
    let beta_sq = beta * beta;

    let f_beta = per_class_metric(&matrices, |c| {
        divide_or_nan(
            (1.0 + beta_sq) * c.true_positive,
            (1.0 + beta_sq) * c.true_positive + c.false_positive + beta_sq * c.false_negative,
        )
    });
    let g_beta = per_class_metric(&matrices, |c| {
        divide_or_nan(
            c.true_positive,
            c.true_positive + c.false_positive + beta * c.false_negative,
        )
    });

    Ok(BetaMeasures {
        beta,
        macro_f_beta: nan_mean(f_beta.view()),
        macro_g_beta: nan_mean(g_beta.view()),
        f_beta,
        g_beta,
    })
}
