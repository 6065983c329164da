//! Dense row-major matrix passed between the reconciler, scaler and predictors.

use serde::{Deserialize, Serialize};

/// A 2D matrix of `f64` values (row-major storage).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Creates a matrix from row-major data, `None` if the length is wrong.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { data, rows, cols })
    }

    /// Builds a matrix from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let data = rows.iter().flatten().copied().collect();
        Some(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Builds a matrix from column vectors of equal length.
    pub fn from_columns(n_rows: usize, columns: &[Vec<f64>]) -> Option<Self> {
        if columns.iter().any(|c| c.len() != n_rows) {
            return None;
        }
        let cols = columns.len();
        let mut data = vec![0.0; n_rows * cols];
        for (j, column) in columns.iter().enumerate() {
            for (i, value) in column.iter().enumerate() {
                data[i * cols + j] = *value;
            }
        }
        Some(Self {
            data,
            rows: n_rows,
            cols,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col). Panics when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Borrow one row.
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // zero-width matrices still yield one empty slice per row
        (0..self.rows).map(move |i| self.row(i))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Apply `f(col, value)` to every cell in place.
    pub fn map_in_place(&mut self, mut f: impl FnMut(usize, f64) -> f64) {
        let cols = self.cols;
        for (idx, value) in self.data.iter_mut().enumerate() {
            *value = f(idx % cols.max(1), *value);
        }
    }
}
