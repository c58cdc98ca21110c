//! The severity-weighted challenge score.
//!
//! The observed weighted credit of a classifier is placed on a scale anchored by
//! two synthetic classifiers scored on the same records:
//!
//! - `perfect`: predicts exactly the true label set of every record (score 1),
//! - `baseline`: predicts only the default class for every record (score 0).
//!
//! Credit is `nansum(W * M)` where `M` is the partial-credit confusion matrix of
//! [`crate::modified`]. A score below 0 means the classifier earned less credit
//! than the baseline.

use crate::modified::modified_confusion_matrix;
use crate::types::{ClassList, InputError, check_weight_shape};
use ndarray::{Array2, ArrayView2};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChallengeError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("The default class '{0}' is not available in the class list.")]
    MissingDefaultClass(String),
}

/// The three weighted credits and the normalized score derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChallengeBreakdown {
    pub observed: f64,
    pub perfect: f64,
    pub baseline: f64,
    pub score: f64,
}

/// Sum of the element-wise product, skipping products that are NaN.
fn weighted_credit(weights: ArrayView2<'_, f64>, matrix: &Array2<f64>) -> f64 {
    weights
        .iter()
        .zip(matrix.iter())
        .map(|(&w, &m)| w * m)
        .filter(|v| !v.is_nan())
        .sum()
}

/// Computes all three credits and the normalized score.
pub fn challenge_breakdown(
    weights: ArrayView2<'_, f64>,
    labels: ArrayView2<'_, bool>,
    outputs: ArrayView2<'_, bool>,
    classes: &ClassList,
    default_class: &str,
) -> Result<ChallengeBreakdown, ChallengeError> {
    let default_index = classes
        .position(default_class)
        .ok_or_else(|| ChallengeError::MissingDefaultClass(default_class.to_string()))?;
    if labels.ncols() != classes.len() {
        return Err(InputError::ClassCountMismatch {
            classes: classes.len(),
            columns: labels.ncols(),
        }
        .into());
    }
    check_weight_shape(weights, classes.len())?;

    let observed = weighted_credit(weights, &modified_confusion_matrix(labels, outputs)?);
    let perfect = weighted_credit(weights, &modified_confusion_matrix(labels, labels)?);

    let mut default_only = Array2::from_elem(labels.dim(), false);
    default_only.column_mut(default_index).fill(true);
    let baseline = weighted_credit(
        weights,
        &modified_confusion_matrix(labels, default_only.view())?,
    );

    let score = if perfect != baseline {
        (observed - baseline) / (perfect - baseline)
    } else {
        log::warn!(
            "Perfect and default-class credits coincide ({perfect}); challenge score set to 0.0"
        );
        0.0
    };

    Ok(ChallengeBreakdown {
        observed,
        perfect,
        baseline,
        score,
    })
}

/// The normalized challenge score, `(observed - baseline) / (perfect - baseline)`,
/// or `0.0` when `perfect == baseline`.
pub fn challenge_metric(
    weights: ArrayView2<'_, f64>,
    labels: ArrayView2<'_, bool>,
    outputs: ArrayView2<'_, bool>,
    classes: &ClassList,
    default_class: &str,
) -> Result<f64, ChallengeError> {
    challenge_breakdown(weights, labels, outputs, classes, default_class).map(|b| b.score)
}
