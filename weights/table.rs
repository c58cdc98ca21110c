//! # Challenge Weight Table
//!
//! The weight table is a square CSV file. The first header cell is empty, the
//! remaining header cells are class identifiers, and every data row starts with
//! the identifier of its class followed by one weight per column:
//!
//! ```text
//! ,164889003,164890007|427172004,426783006
//! 164889003,1.0,0.5,0.375
//! 164890007|427172004,0.5,1.0,0.375
//! 426783006,0.375,0.375,1.0
//! ```
//!
//! Clinically equivalent classes share one row and column, written as
//! `a|b`; every alias resolves to that shared index. Rows must appear in the same
//! order as the columns.

use crate::types::ClassList;
use ahash::AHashMap;
use ndarray::{Array2, Axis};
use polars::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const ALIAS_SEPARATOR: char = '|';

#[derive(Error, Debug)]
pub enum WeightError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to read weight table: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Malformed weight table at line {line}: {message}")]
    MalformedTable { line: usize, message: String },
    #[error("Weight table is not square: {rows} rows for {columns} columns.")]
    NotSquare { rows: usize, columns: usize },
    #[error("Row {position} of the weight table is '{row}' but column {position} is '{column}'.")]
    RowColumnMismatch {
        position: usize,
        row: String,
        column: String,
    },
    #[error("Class '{0}' appears more than once in the weight table.")]
    DuplicateClass(String),
    #[error("The weight table has no entry for the classes: {}", .0.join(", "))]
    MissingClasses(Vec<String>),
    #[error("format of `{0}` is not supported")]
    UnsupportedFormat(String),
}

/// Output representation requested from [`WeightTable::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    /// A bare `ndarray` matrix.
    Dense,
    /// A `polars` frame with a leading `class` column and one column per class.
    Labeled,
}

impl FromStr for WeightFormat {
    type Err = WeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dense" | "np" | "ndarray" => Ok(Self::Dense),
            "labeled" | "labelled" | "pd" | "dataframe" => Ok(Self::Labeled),
            _ => Err(WeightError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A weight table exported in the requested [`WeightFormat`].
#[derive(Debug, Clone)]
pub enum WeightExport {
    Dense(Array2<f64>),
    Labeled(DataFrame),
}

/// The full clinical weight table, addressable by any class alias.
#[derive(Debug, Clone)]
pub struct WeightTable {
    labels: Vec<String>,
    aliases: AHashMap<String, usize>,
    matrix: Array2<f64>,
}

impl WeightTable {
    /// Builds a table from header labels (which may contain `a|b` aliases) and a
    /// square matrix in the same order.
    pub fn from_parts(labels: Vec<String>, matrix: Array2<f64>) -> Result<Self, WeightError> {
        if matrix.nrows() != labels.len() || matrix.ncols() != labels.len() {
            return Err(WeightError::NotSquare {
                rows: matrix.nrows(),
                columns: labels.len().max(matrix.ncols()),
            });
        }
        let mut aliases = AHashMap::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            for alias in label.split(ALIAS_SEPARATOR).map(str::trim) {
                if aliases.insert(alias.to_string(), idx).is_some() {
                    return Err(WeightError::DuplicateClass(alias.to_string()));
                }
            }
        }
        Ok(Self {
            labels,
            aliases,
            matrix,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeightError> {
        let path = path.as_ref();
        log::info!("Loading weight table from '{}'", path.display());
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, WeightError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        if columns.is_empty() {
            return Err(WeightError::MalformedTable {
                line: 1,
                message: "header row lists no classes".to_string(),
            });
        }

        let mut values = Vec::with_capacity(columns.len() * columns.len());
        let mut rows = 0usize;
        for (row_idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = row_idx + 2;
            let row_label = record.get(0).unwrap_or_default();
            if rows >= columns.len() {
                return Err(WeightError::NotSquare {
                    rows: rows + 1,
                    columns: columns.len(),
                });
            }
            if row_label != columns[rows] {
                return Err(WeightError::RowColumnMismatch {
                    position: rows,
                    row: row_label.to_string(),
                    column: columns[rows].clone(),
                });
            }
            for field in record.iter().skip(1) {
                let weight = field.parse::<f64>().map_err(|_| WeightError::MalformedTable {
                    line,
                    message: format!("invalid weight '{field}' in row '{row_label}'"),
                })?;
                values.push(weight);
            }
            rows += 1;
        }

        if rows != columns.len() {
            return Err(WeightError::NotSquare {
                rows,
                columns: columns.len(),
            });
        }

        let matrix = Array2::from_shape_vec((rows, rows), values).map_err(|e| {
            WeightError::MalformedTable {
                line: 0,
                message: e.to_string(),
            }
        })?;
        log::debug!("Weight table holds {rows} classes");
        Self::from_parts(columns, matrix)
    }

    /// Header labels in table order, aliases included.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Table index of a class identifier or any of its aliases.
    pub fn position(&self, class: &str) -> Option<usize> {
        self.aliases.get(class).copied()
    }

    /// The `C x C` sub-matrix aligned with `classes`. All absent classes are
    /// reported together.
    pub fn select(&self, classes: &ClassList) -> Result<Array2<f64>, WeightError> {
        let mut indices = Vec::with_capacity(classes.len());
        let mut missing = Vec::new();
        for name in classes.names() {
            match self.position(name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(WeightError::MissingClasses(missing));
        }
        Ok(self
            .matrix
            .select(Axis(0), &indices)
            .select(Axis(1), &indices))
    }

    /// Exports the whole table, or the part aligned with `classes`, in `format`.
    pub fn export(
        &self,
        format: WeightFormat,
        classes: Option<&ClassList>,
    ) -> Result<WeightExport, WeightError> {
        let (labels, matrix) = match classes {
            Some(classes) => (classes.names().to_vec(), self.select(classes)?),
            None => (self.labels.clone(), self.matrix.clone()),
        };
        match format {
            WeightFormat::Dense => Ok(WeightExport::Dense(matrix)),
            WeightFormat::Labeled => {
                let mut columns: Vec<Column> = Vec::with_capacity(labels.len() + 1);
                columns.push(Series::new("class".into(), labels.as_slice()).into());
                for (j, label) in labels.iter().enumerate() {
                    columns.push(Series::new(label.as_str().into(), matrix.column(j).to_vec()).into());
                }
                Ok(WeightExport::Labeled(DataFrame::new(columns)?))
            }
        }
    }
}
