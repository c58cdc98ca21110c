//! Per-class binary confusion matrices.
//!
//! The result has shape `(classes, 2, 2)` and each class slice is laid out as
//!
//! ```text
//! [[TN, FN],
//!  [FP, TP]]
//! ```
//!
//! i.e. the first axis is the prediction and the second the label.

use crate::types::{InputError, check_shape};
use ndarray::{Array3, ArrayView2, Axis};

/// How much a single record contributes to the cells it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// One unit per record per class.
    #[default]
    Counts,
    /// `1 / max(number of true labels of the record, 1)` per record per class,
    /// so heavily multi-labelled records do not dominate.
    PerRecording,
}

/// The four cells of one class's confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassConfusion {
    pub true_positive: f64,
    pub false_positive: f64,
    pub false_negative: f64,
    pub true_negative: f64,
}

impl ClassConfusion {
    /// Reads class `class` out of a `(classes, 2, 2)` confusion array.
    pub fn from_matrices(matrices: &Array3<f64>, class: usize) -> Self {
        Self {
            true_positive: matrices[[class, 1, 1]],
            false_positive: matrices[[class, 1, 0]],
            false_negative: matrices[[class, 0, 1]],
            true_negative: matrices[[class, 0, 0]],
        }
    }

    pub fn total(&self) -> f64 {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }
}

/// Accumulates one `[[TN, FN], [FP, TP]]` matrix per class over all records.
pub fn binary_confusion_matrices(
    labels: ArrayView2<'_, bool>,
    outputs: ArrayView2<'_, bool>,
    normalization: Normalization,
) -> Result<Array3<f64>, InputError> {
    check_shape(outputs, "binary_pred", labels.dim())?;
    let num_classes = labels.ncols();
    let mut matrices = Array3::<f64>::zeros((num_classes, 2, 2));

    for (label_row, output_row) in labels
        .axis_iter(Axis(0))
        .zip(outputs.axis_iter(Axis(0)))
    {
        let increment = match normalization {
            Normalization::Counts => 1.0,
            Normalization::PerRecording => {
                let positives = label_row.iter().filter(|&&l| l).count().max(1);
                1.0 / positives as f64
            }
        };
        for (class, (&label, &output)) in label_row.iter().zip(output_row.iter()).enumerate() {
            matrices[[class, usize::from(output), usize::from(label)]] += increment;
        }
    }

    Ok(matrices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn counts_split_into_four_cells() {
        let labels = array![[true, false], [false, true]];
        let outputs = array![[true, false], [true, false]];
        let matrices =
            binary_confusion_matrices(labels.view(), outputs.view(), Normalization::Counts)
                .unwrap();

        let n = ClassConfusion::from_matrices(&matrices, 0);
        assert_eq!(n.true_positive, 1.0);
        assert_eq!(n.false_positive, 1.0);
        assert_eq!(n.false_negative, 0.0);
        assert_eq!(n.true_negative, 0.0);

        let a = ClassConfusion::from_matrices(&matrices, 1);
        assert_eq!(a.true_positive, 0.0);
        assert_eq!(a.false_positive, 0.0);
        assert_eq!(a.false_negative, 1.0);
        assert_eq!(a.true_negative, 1.0);
    }

    #[test]
    fn counts_sum_to_record_count_for_every_class() {
        let labels = array![
            [true, false, true],
            [false, false, true],
            [true, true, false],
            [false, false, false],
        ];
        let outputs = array![
            [true, true, false],
            [false, false, true],
            [false, true, true],
            [true, false, false],
        ];
        let matrices =
            binary_confusion_matrices(labels.view(), outputs.view(), Normalization::Counts)
                .unwrap();
        for class in 0..3 {
            assert_eq!(ClassConfusion::from_matrices(&matrices, class).total(), 4.0);
        }
    }

    #[test]
    fn per_recording_mode_divides_by_label_count() {
        // Record 0 has two true labels, record 1 none (normalizer clamps to 1).
        let labels = array![[true, true, false], [false, false, false]];
        let outputs = array![[true, false, true], [false, false, true]];
        let matrices = binary_confusion_matrices(
            labels.view(),
            outputs.view(),
            Normalization::PerRecording,
        )
        .unwrap();

        let first = ClassConfusion::from_matrices(&matrices, 0);
        assert_abs_diff_eq!(first.true_positive, 0.5);
        assert_abs_diff_eq!(first.true_negative, 1.0);

        let second = ClassConfusion::from_matrices(&matrices, 1);
        assert_abs_diff_eq!(second.false_negative, 0.5);

        let third = ClassConfusion::from_matrices(&matrices, 2);
        assert_abs_diff_eq!(third.false_positive, 1.5);
        assert_abs_diff_eq!(third.total(), 1.5);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let labels = array![[true, false]];
        let outputs = array![[true], [false]];
        assert!(matches!(
            binary_confusion_matrices(labels.view(), outputs.view(), Normalization::Counts),
            Err(InputError::ShapeMismatch { .. })
        ));
    }
}
