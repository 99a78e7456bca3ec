//! Dense row-major matrices for weights and input activations, and the
//! strided views the replayer hands to each tile.

use std::{fs::File, io::Read, path::Path};

use itertools::Itertools;

use crate::error::{NeuroSimError, Result};

/// parse comma separated numbers, one row per non-empty line
///
/// a single trailing comma on a line is accepted
pub fn parse_csv(contents: &str, path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (line_index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line = line.strip_suffix(',').unwrap_or(line);
        let row: Vec<f64> = line
            .split(',')
            .enumerate()
            .map(|(col_index, value)| {
                let value = value.trim();
                value
                    .parse::<f64>()
                    .map_err(|_| NeuroSimError::MalformedInput {
                        path: path.to_path_buf(),
                        line: line_index + 1,
                        column: col_index + 1,
                        value: value.to_string(),
                    })
            })
            .try_collect()?;
        rows.push(row);
    }
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(NeuroSimError::shape_mismatch(
                "matrix data",
                rows * cols,
                data.len(),
            ));
        }
        Ok(Matrix { rows, cols, data })
    }

    pub fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let data = (0..rows)
            .cartesian_product(0..cols)
            .map(|(r, c)| f(r, c))
            .collect();
        Matrix { rows, cols, data }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((index, row)) = rows.iter().find_position(|row| row.len() != cols) {
            return Err(NeuroSimError::shape_mismatch(
                format!("row {}", index + 1),
                format!("{} columns", cols),
                format!("{} columns", row.len()),
            ));
        }
        let num_rows = rows.len();
        let data = rows.into_iter().flatten().collect();
        Ok(Matrix {
            rows: num_rows,
            cols,
            data,
        })
    }

    /// # Description
    /// load a dense comma separated matrix
    /// # Errors
    /// * `FileNotFound` when the file can not be opened
    /// * `MalformedInput` for a field that is not a number
    /// * `ShapeMismatch` when the lines do not have the same length
    pub fn load(file_name: impl AsRef<Path>) -> Result<Self> {
        let path = file_name.as_ref();
        let mut file = File::open(path).map_err(|_| NeuroSimError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_rows(parse_csv(&contents, path)?)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn view(&self) -> MatrixView<'_> {
        MatrixView {
            matrix: self,
            row_offset: 0,
            col_offset: 0,
            group_rows: self.rows,
            group_stride: self.rows,
            groups: 1,
            cols: self.cols,
        }
    }

    /// contiguous sub-block
    pub fn block(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<MatrixView<'_>> {
        self.strided(row, col, rows, cols, rows, 1)
    }

    /// `groups` blocks of `group_rows` rows each, the blocks starting
    /// `group_stride` rows apart, all sharing the same column window
    pub fn strided(
        &self,
        row: usize,
        col: usize,
        group_rows: usize,
        cols: usize,
        group_stride: usize,
        groups: usize,
    ) -> Result<MatrixView<'_>> {
        let row_end = if groups == 0 || group_rows == 0 {
            row
        } else {
            row + (groups - 1) * group_stride + group_rows
        };
        if row_end > self.rows || col + cols > self.cols {
            return Err(NeuroSimError::shape_mismatch(
                "matrix view",
                format!("at most {}x{}", self.rows, self.cols),
                format!("rows up to {} and columns up to {}", row_end, col + cols),
            ));
        }
        Ok(MatrixView {
            matrix: self,
            row_offset: row,
            col_offset: col,
            group_rows,
            group_stride,
            groups,
            cols,
        })
    }
}

/// A window onto a [`Matrix`] without copying it.
///
/// Row `r` of the view is row `r % group_rows` of group `r / group_rows`.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a> {
    matrix: &'a Matrix,
    row_offset: usize,
    col_offset: usize,
    group_rows: usize,
    group_stride: usize,
    groups: usize,
    cols: usize,
}

impl<'a> MatrixView<'a> {
    pub fn rows(&self) -> usize {
        self.group_rows * self.groups
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols == 0
    }

    fn source_row(&self, row: usize) -> usize {
        self.row_offset + (row / self.group_rows) * self.group_stride + row % self.group_rows
    }

    pub fn row(&self, row: usize) -> &'a [f64] {
        let source = self.matrix.row(self.source_row(row));
        &source[self.col_offset..self.col_offset + self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.row(row)[col]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [f64]> + '_ {
        (0..self.rows()).map(move |r| self.row(r))
    }

    pub fn to_matrix(&self) -> Matrix {
        Matrix::from_fn(self.rows(), self.cols, |r, c| self.get(r, c))
    }
}
