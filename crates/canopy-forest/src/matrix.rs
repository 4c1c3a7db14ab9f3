//! Column-major feature matrix.

use crate::error::ForestError;

/// Dense, column-major `f64` matrix. `NaN` marks a missing value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Matrix {
    values: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl Matrix {
    /// Build a matrix from column vectors: `columns[col][row]`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::RaggedColumn`] when the columns differ in length.
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self, ForestError> {
        let n_cols = columns.len();
        let n_rows = columns.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for (column, col) in columns.iter().enumerate() {
            if col.len() != n_rows {
                return Err(ForestError::RaggedColumn {
                    column,
                    expected: n_rows,
                    got: col.len(),
                });
            }
            values.extend_from_slice(col);
        }
        Ok(Self {
            values,
            n_rows,
            n_cols,
        })
    }

    /// Build a matrix from row vectors: `rows[row][col]`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::RaggedRow`] when the rows differ in length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ForestError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_cols {
                return Err(ForestError::RaggedRow {
                    row,
                    expected: n_cols,
                    got: values.len(),
                });
            }
        }
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for col in 0..n_cols {
            values.extend(rows.iter().map(|r| r[col]));
        }
        Ok(Self {
            values,
            n_rows,
            n_cols,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Value at `(row, col)`. Panics when out of bounds.
    #[inline]
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[col * self.n_rows + row]
    }

    /// Borrow one column.
    #[must_use]
    pub fn column(&self, col: usize) -> &[f64] {
        &self.values[col * self.n_rows..(col + 1) * self.n_rows]
    }

    /// Copy one row out of the matrix.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.n_cols).map(|col| self.value(row, col)).collect()
    }
}
