//! # Label and Prediction Tables
//!
//! Ground truth, binary predictions and scalar predictions are read from
//! tab-separated files with one row per record and one column per class. The
//! header names the classes; an optional leading `record` column carries the
//! record identifiers. Every other cell must be a finite number.
//!
//! The three tables of one run may list their classes in different orders, so
//! each is aligned to a shared [`ClassList`] before evaluation.

use crate::types::{ClassList, EvaluationInputs, InputError, binary_matrix};
use ndarray::{Array2, Axis};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Name of the optional column holding record identifiers.
pub const RECORD_COLUMN: &str = "record";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("The file '{0}' contains no class columns.")]
    NoClassColumns(String),
    #[error(
        "The column '{column_name}' could not be converted to a number. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        found_type: String,
    },
    #[error(
        "Missing or null values were found in the column '{0}'. Every record must have a value for every class."
    )]
    MissingValuesFound(String),
    #[error("Non-finite values (NaN or Infinity) were found in the column '{0}'.")]
    NonFiniteValuesFound(String),
    #[error("The class '{0}' is not present in the table.")]
    ClassNotFound(String),
    #[error("The table has classes that are not in the class list: {}", .0.join(", "))]
    UnexpectedClasses(Vec<String>),
    #[error("Record identifiers of '{name}' differ from the ground truth at row {row}: '{found}' vs '{expected}'.")]
    RecordMismatch {
        name: &'static str,
        row: usize,
        expected: String,
        found: String,
    },
    #[error("'{name}' has {found} records but the ground truth has {expected}.")]
    RecordCountMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
}

/// A numeric table with its record and class identifiers.
#[derive(Debug, Clone)]
pub struct LabeledMatrix {
    pub record_ids: Vec<String>,
    pub classes: Vec<String>,
    /// Shape `(record_ids.len(), classes.len())`.
    pub values: Array2<f64>,
}

impl LabeledMatrix {
    /// Reorders the columns into `classes` order. Classes missing from the table
    /// and table columns missing from `classes` are both errors.
    pub fn align(&self, classes: &ClassList) -> Result<Array2<f64>, DataError> {
        let own = ClassList::new(self.classes.iter().cloned())?;
        let unexpected: Vec<String> = self
            .classes
            .iter()
            .filter(|name| classes.position(name).is_none())
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(DataError::UnexpectedClasses(unexpected));
        }
        let mut order = Vec::with_capacity(classes.len());
        for name in classes.names() {
            let idx = own
                .position(name)
                .ok_or_else(|| DataError::ClassNotFound(name.clone()))?;
            order.push(idx);
        }
        Ok(self.values.select(Axis(1), &order))
    }
}

fn extract_numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, DataError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(DataError::MissingValuesFound(column_name.to_string()));
    }

    let wrong_type = || DataError::ColumnWrongType {
        column_name: column_name.to_string(),
        found_type: format!("{:?}", series.dtype()),
    };
    let casted = series.cast(&DataType::Float64).map_err(|_| wrong_type())?;
    if casted.null_count() > 0 {
        return Err(wrong_type());
    }

    let values: Vec<f64> = casted.f64()?.rechunk().into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(DataError::NonFiniteValuesFound(column_name.to_string()));
    }
    Ok(values)
}

fn extract_record_ids(df: &DataFrame) -> Result<Vec<String>, DataError> {
    let series = df.column(RECORD_COLUMN)?.cast(&DataType::String)?;
    let ids = series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(i, id)| match id {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => (i + 1).to_string(),
        })
        .collect();
    Ok(ids)
}

/// Reads one tab-separated label or prediction table.
pub fn load_label_matrix(path: impl AsRef<Path>) -> Result<LabeledMatrix, DataError> {
    let path = path.as_ref();
    log::info!("Loading table from '{}'", path.display());

    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(b'\t')),
        )
        .finish()?;

    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let has_record_column = column_names.iter().any(|name| name == RECORD_COLUMN);
    let classes: Vec<String> = column_names
        .into_iter()
        .filter(|name| name != RECORD_COLUMN)
        .collect();
    if classes.is_empty() {
        return Err(DataError::NoClassColumns(path.display().to_string()));
    }

    let num_records = df.height();
    let record_ids = if has_record_column {
        extract_record_ids(&df)?
    } else {
        (1..=num_records).map(|i| i.to_string()).collect()
    };

    let mut values = Array2::zeros((num_records, classes.len()));
    for (j, class) in classes.iter().enumerate() {
        let column = extract_numeric_column(&df, class)?;
        values
            .column_mut(j)
            .iter_mut()
            .zip(column)
            .for_each(|(dst, v)| *dst = v);
    }
    log::debug!(
        "Loaded {num_records} records x {} classes from '{}'",
        classes.len(),
        path.display()
    );

    Ok(LabeledMatrix {
        record_ids,
        classes,
        values,
    })
}

fn check_records(
    name: &'static str,
    truth: &LabeledMatrix,
    other: &LabeledMatrix,
) -> Result<(), DataError> {
    if truth.record_ids.len() != other.record_ids.len() {
        return Err(DataError::RecordCountMismatch {
            name,
            expected: truth.record_ids.len(),
            found: other.record_ids.len(),
        });
    }
    if let Some((row, (expected, found))) = truth
        .record_ids
        .iter()
        .zip(&other.record_ids)
        .enumerate()
        .find(|(_, (a, b))| a != b)
    {
        return Err(DataError::RecordMismatch {
            name,
            row,
            expected: expected.clone(),
            found: found.clone(),
        });
    }
    Ok(())
}

/// Loads the three tables of one evaluation and aligns them to a common class
/// list. Without `classes`, the column order of the ground truth is used.
pub fn load_evaluation_inputs(
    truth_path: impl AsRef<Path>,
    binary_path: impl AsRef<Path>,
    scalar_path: impl AsRef<Path>,
    classes: Option<ClassList>,
) -> Result<EvaluationInputs, DataError> {
    let truth = load_label_matrix(truth_path)?;
    let binary = load_label_matrix(binary_path)?;
    let scalar = load_label_matrix(scalar_path)?;
    check_records("binary_pred", &truth, &binary)?;
    check_records("scalar_pred", &truth, &scalar)?;

    let classes = match classes {
        Some(classes) => classes,
        None => ClassList::new(truth.classes.iter().cloned())?,
    };
    let truth_values = binary_matrix(truth.align(&classes)?.view(), "truth")?;
    let binary_values = binary_matrix(binary.align(&classes)?.view(), "binary_pred")?;
    let scalar_values = scalar.align(&classes)?;
    Ok(EvaluationInputs::new(
        classes,
        truth_values,
        binary_values,
        scalar_values,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    fn create_test_tsv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_record_ids_and_classes() {
        let file = create_test_tsv("record\tNSR\tAF\nA0001\t1\t0\nA0002\t0\t1\n");
        let table = load_label_matrix(file.path()).unwrap();
        assert_eq!(table.record_ids, vec!["A0001", "A0002"]);
        assert_eq!(table.classes, vec!["NSR", "AF"]);
        assert_eq!(table.values, array![[1.0, 0.0], [0.0, 1.0]]);
    }

    #[test]
    fn generates_record_ids_without_record_column() {
        let file = create_test_tsv("NSR\tAF\n0.25\t0.75\n0.5\t0.5\n");
        let table = load_label_matrix(file.path()).unwrap();
        assert_eq!(table.record_ids, vec!["1", "2"]);
    }

    #[test]
    fn missing_values_are_rejected() {
        let file = create_test_tsv("NSR\tAF\n1\t\n0\t1\n");
        match load_label_matrix(file.path()).unwrap_err() {
            DataError::MissingValuesFound(col) => assert_eq!(col, "AF"),
            other => panic!("Expected MissingValuesFound(AF), got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let file = create_test_tsv("NSR\tAF\n1\tyes\n0\t1\n");
        match load_label_matrix(file.path()).unwrap_err() {
            DataError::ColumnWrongType { column_name, .. } => assert_eq!(column_name, "AF"),
            other => panic!("Expected ColumnWrongType(AF), got {other:?}"),
        }
    }

    #[test]
    fn align_reorders_and_checks_classes() {
        let table = LabeledMatrix {
            record_ids: vec!["1".into()],
            classes: vec!["AF".into(), "NSR".into()],
            values: array![[0.25, 0.75]],
        };
        let classes = ClassList::new(["NSR", "AF"]).unwrap();
        assert_eq!(table.align(&classes).unwrap(), array![[0.75, 0.25]]);

        let wider = ClassList::new(["NSR", "AF", "PVC"]).unwrap();
        match table.align(&wider).unwrap_err() {
            DataError::ClassNotFound(name) => assert_eq!(name, "PVC"),
            other => panic!("Expected ClassNotFound, got {other:?}"),
        }

        let narrower = ClassList::new(["NSR"]).unwrap();
        assert!(matches!(
            table.align(&narrower),
            Err(DataError::UnexpectedClasses(_))
        ));
    }

    #[test]
    fn evaluation_inputs_align_all_three_tables() {
        let dir = tempdir().unwrap();
        let truth = dir.path().join("truth.tsv");
        let binary = dir.path().join("binary.tsv");
        let scalar = dir.path().join("scalar.tsv");
        std::fs::write(&truth, "record\tNSR\tAF\nr1\t1\t0\nr2\t0\t1\n").unwrap();
        std::fs::write(&binary, "record\tAF\tNSR\nr1\t0\t1\nr2\t1\t1\n").unwrap();
        std::fs::write(&scalar, "record\tNSR\tAF\nr1\t0.75\t0.25\nr2\t0.5\t0.625\n").unwrap();

        let inputs = load_evaluation_inputs(&truth, &binary, &scalar, None).unwrap();
        assert_eq!(inputs.classes.names(), &["NSR".to_string(), "AF".to_string()]);
        assert_eq!(inputs.binary, array![[true, false], [true, true]]);
        assert_eq!(inputs.scalar, array![[0.75, 0.25], [0.5, 0.625]]);
    }

    #[test]
    fn evaluation_inputs_require_matching_records() {
        let dir = tempdir().unwrap();
        let truth = dir.path().join("truth.tsv");
        let other = dir.path().join("other.tsv");
        std::fs::write(&truth, "record\tNSR\nr1\t1\nr2\t0\n").unwrap();
        std::fs::write(&other, "record\tNSR\nr1\t1\nr3\t0\n").unwrap();

        match load_evaluation_inputs(&truth, &other, &truth, None).unwrap_err() {
            DataError::RecordMismatch { name, row, .. } => {
                assert_eq!(name, "binary_pred");
                assert_eq!(row, 1);
            }
            other => panic!("Expected RecordMismatch, got {other:?}"),
        }
    }

    #[test]
    fn evaluation_inputs_reject_non_binary_truth() {
        let dir = tempdir().unwrap();
        let truth = dir.path().join("truth.tsv");
        std::fs::write(&truth, "NSR\n0.5\n").unwrap();
        assert!(matches!(
            load_evaluation_inputs(&truth, &truth, &truth, None),
            Err(DataError::Input(InputError::NonBinaryValue { .. }))
        ));
    }
}
