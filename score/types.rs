//! # Validated Evaluation Inputs
//!
//! Every metric in this crate works on dense `ndarray` matrices whose columns are
//! indexed by the integer position of a class in a [`ClassList`]. This module owns
//! the boundary where caller-supplied numeric matrices are checked and turned into
//! those representations:
//!
//! - Label and binary-prediction matrices become `Array2<bool>`, so the
//!   four-way TP/FP/FN/TN split downstream is exhaustive by construction.
//! - Scalar predictions stay `f64` but must be finite, since they are ranked.
//! - All matrices must share one `(records, classes)` shape with `records >= 1`
//!   and `classes >= 1`.

use ahash::AHashMap;
use ndarray::{Array2, ArrayView1, ArrayView2};
use thiserror::Error;

/// Shape and value contract violations in the evaluation inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Evaluation requires at least one record and one class, got {records} x {classes}.")]
    EmptyInput { records: usize, classes: usize },
    #[error("Matrix '{name}' has shape {found:?}, expected {expected:?}.")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("The class list has {classes} entries but the matrices have {columns} columns.")]
    ClassCountMismatch { classes: usize, columns: usize },
    #[error("Weight matrix has shape {found:?}, expected a square {expected} x {expected} matrix.")]
    WeightShape { expected: usize, found: (usize, usize) },
    #[error(
        "Matrix '{name}' contains the value {value} at record {row}, class {column}; only 0 and 1 are allowed."
    )]
    NonBinaryValue {
        name: &'static str,
        row: usize,
        column: usize,
        value: f64,
    },
    #[error("Scalar prediction at record {row}, class {column} is not finite ({value}).")]
    NonFiniteScore { row: usize, column: usize, value: f64 },
    #[error("Class identifier '{0}' appears more than once in the class list.")]
    DuplicateClass(String),
    #[error("The class list is empty.")]
    EmptyClassList,
}

/// Ordered, duplicate-free class identifiers. The position of an identifier is the
/// column it occupies in every label, prediction and weight matrix.
#[derive(Debug, Clone)]
pub struct ClassList {
    names: Vec<String>,
    positions: AHashMap<String, usize>,
}

impl PartialEq for ClassList {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl ClassList {
    pub fn new<I, S>(names: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(InputError::EmptyClassList);
        }
        let mut positions = AHashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(InputError::DuplicateClass(name.clone()));
            }
        }
        Ok(Self { names, positions })
    }

    /// Column index of `class`, if it is part of the list.
    pub fn position(&self, class: &str) -> Option<usize> {
        self.positions.get(class).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Converts a numeric 0/1 matrix into a boolean one, rejecting any other value.
pub fn binary_matrix<T>(values: ArrayView2<'_, T>, name: &'static str) -> Result<Array2<bool>, InputError>
where
    T: Copy + Into<f64>,
{
    let mut out = Array2::from_elem(values.dim(), false);
    for ((row, column), &raw) in values.indexed_iter() {
        let value: f64 = raw.into();
        out[[row, column]] = if value == 1.0 {
            true
        } else if value == 0.0 {
            false
        } else {
            return Err(InputError::NonBinaryValue {
                name,
                row,
                column,
                value,
            });
        };
    }
    Ok(out)
}

/// Fails unless `matrix` has exactly the `expected` shape.
pub fn check_shape<T>(
    matrix: ArrayView2<'_, T>,
    name: &'static str,
    expected: (usize, usize),
) -> Result<(), InputError> {
    if matrix.dim() != expected {
        return Err(InputError::ShapeMismatch {
            name,
            expected,
            found: matrix.dim(),
        });
    }
    Ok(())
}

/// Fails unless `weights` is `classes x classes`.
pub fn check_weight_shape(weights: ArrayView2<'_, f64>, classes: usize) -> Result<(), InputError> {
    if weights.dim() != (classes, classes) {
        return Err(InputError::WeightShape {
            expected: classes,
            found: weights.dim(),
        });
    }
    Ok(())
}

/// Fails on the first NaN or infinite score, in row-major order.
pub fn check_finite_scores(scores: ArrayView2<'_, f64>) -> Result<(), InputError> {
    if let Some(((row, column), &value)) = scores.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(InputError::NonFiniteScore { row, column, value });
    }
    Ok(())
}

/// Mean over the non-NaN entries; NaN when every entry is NaN (or there are none).
pub fn nan_mean(values: ArrayView1<'_, f64>) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// The three matrices of one evaluation run, checked against each other and
/// against the class list.
#[derive(Debug, Clone)]
pub struct EvaluationInputs {
    pub classes: ClassList,
    /// Ground truth `L`, shape `(records, classes)`.
    pub truth: Array2<bool>,
    /// Thresholded predictions `B`, same shape as `truth`.
    pub binary: Array2<bool>,
    /// Scalar predictions `S`, same shape as `truth`.
    pub scalar: Array2<f64>,
}

impl EvaluationInputs {
    pub fn new(
        classes: ClassList,
        truth: Array2<bool>,
        binary: Array2<bool>,
        scalar: Array2<f64>,
    ) -> Result<Self, InputError> {
        let (records, columns) = truth.dim();
        if records == 0 || columns == 0 {
            return Err(InputError::EmptyInput {
                records,
                classes: columns,
            });
        }
        if columns != classes.len() {
            return Err(InputError::ClassCountMismatch {
                classes: classes.len(),
                columns,
            });
        }
        check_shape(binary.view(), "binary_pred", truth.dim())?;
        check_shape(scalar.view(), "scalar_pred", truth.dim())?;
        check_finite_scores(scalar.view())?;
        Ok(Self {
            classes,
            truth,
            binary,
            scalar,
        })
    }

    /// Builds the inputs from numeric 0/1 label and prediction matrices.
    pub fn from_numeric<T>(
        classes: ClassList,
        truth: ArrayView2<'_, T>,
        binary: ArrayView2<'_, T>,
        scalar: ArrayView2<'_, f64>,
    ) -> Result<Self, InputError>
    where
        T: Copy + Into<f64>,
    {
        let truth = binary_matrix(truth, "truth")?;
        let binary = binary_matrix(binary, "binary_pred")?;
        Self::new(classes, truth, binary, scalar.to_owned())
    }

    pub fn num_records(&self) -> usize {
        self.truth.nrows()
    }

    pub fn num_classes(&self) -> usize {
        self.truth.ncols()
    }
}
