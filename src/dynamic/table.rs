use ndarray::{Array1, Array2};

use crate::dynamic::space::TableShape;
use crate::dynamic::Real;
use crate::error::{Error, Result};

/// Dense table of state values, indexed by the state space's dense index.
///
/// Grid tables are stored row-major and can be reshaped with [`ValueTable::to_grid`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable<T> {
    values: Array1<T>,
    shape: TableShape,
}

impl<T: Real> ValueTable<T> {
    /// A zero-initialized table.
    pub fn zeros(shape: TableShape) -> Self {
        Self {
            values: Array1::from_elem(shape.len(), T::zero()),
            shape,
        }
    }

    /// Wraps existing values; fails when the length does not match `shape`.
    pub fn from_vec(shape: TableShape, values: Vec<T>) -> Result<Self> {
        if values.len() != shape.len() {
            return Err(Error::invalid_index(format!(
                "value table of {} entries does not fit shape {:?}",
                values.len(),
                shape
            )));
        }
        Ok(Self {
            values: Array1::from_vec(values),
            shape,
        })
    }

    pub fn shape(&self) -> TableShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a dense state index.
    pub fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    /// Value of grid cell `(row, col)`; `None` for linear tables or outside cells.
    pub fn get_cell(&self, row: usize, col: usize) -> Option<T> {
        match self.shape {
            TableShape::Grid { rows, cols } if row < rows && col < cols => {
                self.get(row * cols + col)
            }
            _ => None,
        }
    }

    pub fn values(&self) -> &Array1<T> {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.values.to_vec()
    }

    /// The table as a `rows x cols` array.
    pub fn to_grid(&self) -> Result<Array2<T>> {
        match self.shape {
            TableShape::Grid { rows, cols } => {
                Ok(Array2::from_shape_vec((rows, cols), self.values.to_vec())?)
            }
            TableShape::Linear(n) => Err(Error::invalid_index(format!(
                "linear table of {n} states has no grid layout"
            ))),
        }
    }

    /// Largest absolute entrywise difference; `None` if the shapes differ.
    pub fn max_abs_diff(&self, other: &ValueTable<T>) -> Option<T> {
        if self.shape != other.shape {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(other.values.iter())
                .fold(T::zero(), |acc, (&a, &b)| acc.max((a - b).abs())),
        )
    }
}
