//! Immutable luminosity grid.

use ndarray::{Array2, ArrayView2};
use thiserror::Error;

/// Errors raised when building a [`PixelGrid`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Pixel grid is empty")]
    EmptyGrid,
    #[error("Row {row} has {found} values, expected {expected}")]
    RaggedGrid {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite luminosity at row {row}, column {col}")]
    NonFiniteValue { row: usize, col: usize },
}

/// Rectangular grid of finite luminosity values addressed by `(row, col)`.
///
/// Rows run along the image y axis and columns along x. Once built the grid
/// never changes, so every pass over it sees the same values.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    values: Array2<f64>,
}

impl PixelGrid {
    /// Wrap an array, rejecting empty shapes and NaN/infinite values.
    pub fn new(values: Array2<f64>) -> Result<Self, GridError> {
        if values.is_empty() {
            return Err(GridError::EmptyGrid);
        }
        if let Some(((row, col), _)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(GridError::NonFiniteValue { row, col });
        }
        Ok(Self { values })
    }

    /// Build a grid from row vectors, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, GridError> {
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || n_cols == 0 {
            return Err(GridError::EmptyGrid);
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_cols {
                return Err(GridError::RaggedGrid {
                    row,
                    expected: n_cols,
                    found: values.len(),
                });
            }
        }

        let n_rows = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((n_rows, n_cols), flat)
            .map_err(|_| GridError::EmptyGrid)?;
        Self::new(values)
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    /// Shape as `(n_rows, n_cols)`.
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn pixel_count(&self) -> usize {
        self.values.len()
    }

    /// Luminosity at `(row, col)`. Panics when out of bounds.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[[row, col]]
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Smallest and largest luminosity in the grid.
    pub fn min_max(&self) -> (f64, f64) {
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

impl TryFrom<Array2<f64>> for PixelGrid {
    type Error = GridError;

    fn try_from(values: Array2<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_new_grid() {
        let grid = PixelGrid::new(arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])).unwrap();
        assert_eq!(grid.dim(), (2, 3));
        assert_eq!(grid.n_rows(), 2);
        assert_eq!(grid.n_cols(), 3);
        assert_eq!(grid.pixel_count(), 6);
        assert_eq!(grid.value(1, 2), 6.0);
        assert_eq!(grid.min_max(), (1.0, 6.0));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(
            PixelGrid::new(Array2::zeros((0, 4))),
            Err(GridError::EmptyGrid)
        );
        assert_eq!(PixelGrid::from_rows(vec![]), Err(GridError::EmptyGrid));
        assert_eq!(
            PixelGrid::from_rows(vec![vec![], vec![]]),
            Err(GridError::EmptyGrid)
        );
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = PixelGrid::from_rows(vec![vec![1.0, 2.0], vec![3.0], vec![4.0, 5.0]]);
        assert_eq!(
            result,
            Err(GridError::RaggedGrid {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let result = PixelGrid::new(arr2(&[[1.0, 2.0], [f64::NAN, 4.0]]));
        assert_eq!(result, Err(GridError::NonFiniteValue { row: 1, col: 0 }));

        let result = PixelGrid::from_rows(vec![vec![0.0, f64::INFINITY]]);
        assert_eq!(result, Err(GridError::NonFiniteValue { row: 0, col: 1 }));
    }

    #[test]
    fn test_from_rows_layout() {
        let grid = PixelGrid::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(grid.value(0, 1), 2.0);
        assert_eq!(grid.value(1, 0), 3.0);
    }
}
