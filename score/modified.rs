//! Multi-label, multi-class confusion matrix with partial credit.
//!
//! Rows are true classes and columns are predicted classes. A record spreads one
//! unit of credit over every (true class, predicted class) pair it contains,
//! scaled by the size of the union of its true and predicted label sets. A
//! record whose single true label is predicted alone therefore contributes
//! exactly 1 to the diagonal.

use crate::types::{InputError, check_shape};
use ndarray::{Array2, ArrayView2, Axis};

/// Builds the `(classes, classes)` partial-credit confusion matrix.
pub fn modified_confusion_matrix(
    labels: ArrayView2<'_, bool>,
    outputs: ArrayView2<'_, bool>,
) -> Result<Array2<f64>, InputError> {
    check_shape(outputs, "binary_pred", labels.dim())?;
    let num_classes = labels.ncols();
    let mut matrix = Array2::<f64>::zeros((num_classes, num_classes));

    let mut predicted = Vec::with_capacity(num_classes);
    for (label_row, output_row) in labels
        .axis_iter(Axis(0))
        .zip(outputs.axis_iter(Axis(0)))
    {
        predicted.clear();
        predicted.extend(
            output_row
                .iter()
                .enumerate()
                .filter_map(|(k, &out)| out.then_some(k)),
        );

        let union = label_row
            .iter()
            .zip(output_row.iter())
            .filter(|&(&l, &o)| l || o)
            .count()
            .max(1);
        let credit = 1.0 / union as f64;

        for (j, _) in label_row.iter().enumerate().filter(|&(_, &l)| l) {
            for &k in &predicted {
                matrix[[j, k]] += credit;
            }
        }
    }

    Ok(matrix)
}
