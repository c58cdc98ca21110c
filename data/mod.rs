pub mod matrix;

pub use matrix::{DataError, LabeledMatrix, load_evaluation_inputs, load_label_matrix};
