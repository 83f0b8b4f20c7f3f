//! The shape of the samples making up one pixel.
use core::fmt;

use nd_texel::TensorLookup;

use crate::error::{Error, Result};

/// How the elements of a tensor are laid out along the tensor stride.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TensorShape {
    ColumnVector,
    RowVector,
    /// A full matrix, stored column by column.
    ColumnMajorMatrix,
    /// A full matrix, stored row by row.
    RowMajorMatrix,
    /// Only the diagonal of a square matrix is stored.
    DiagonalMatrix,
    /// The diagonal, then the upper triangle column-wise, of a square symmetric matrix.
    SymmetricMatrix,
    /// The diagonal, then the upper triangle column-wise, of an upper triangular matrix.
    UpperTriangularMatrix,
    /// The diagonal, then the lower triangle row-wise, of a lower triangular matrix.
    LowerTriangularMatrix,
}

/// Describes the tensor of an image: how many samples a pixel has and what they mean.
///
/// A scalar is a column vector with one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tensor {
    shape: TensorShape,
    elements: usize,
    rows: usize,
}

impl Tensor {
    pub const fn scalar() -> Self {
        Tensor {
            shape: TensorShape::ColumnVector,
            elements: 1,
            rows: 1,
        }
    }

    pub const fn vector(n: usize) -> Self {
        Tensor {
            shape: TensorShape::ColumnVector,
            elements: n,
            rows: n,
        }
    }

    /// A full matrix in column-major order, or a vector when one of the extents is 1.
    pub const fn matrix(rows: usize, columns: usize) -> Self {
        if columns == 1 {
            Tensor::vector(rows)
        } else if rows == 1 {
            Tensor {
                shape: TensorShape::RowVector,
                elements: columns,
                rows: 1,
            }
        } else {
            Tensor {
                shape: TensorShape::ColumnMajorMatrix,
                elements: rows * columns,
                rows,
            }
        }
    }

    /// A tensor of a given shape. For the square shapes `columns` must equal `rows`.
    pub fn with_shape(shape: TensorShape, rows: usize, columns: usize) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(Error::InvalidParameter("tensor extents must be positive"));
        }

        let elements = match shape {
            TensorShape::ColumnVector if columns == 1 => rows,
            TensorShape::RowVector if rows == 1 => columns,
            TensorShape::ColumnVector | TensorShape::RowVector => {
                return Err(Error::InvalidParameter("a vector has a single row or column"))
            }
            TensorShape::ColumnMajorMatrix | TensorShape::RowMajorMatrix => rows * columns,
            _ if rows != columns => {
                return Err(Error::InvalidParameter("this tensor shape must be square"))
            }
            TensorShape::DiagonalMatrix => rows,
            TensorShape::SymmetricMatrix
            | TensorShape::UpperTriangularMatrix
            | TensorShape::LowerTriangularMatrix => rows * (rows + 1) / 2,
        };

        Ok(Tensor {
            shape,
            elements,
            rows,
        })
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        match self.shape {
            TensorShape::ColumnVector => 1,
            TensorShape::RowVector => self.elements,
            TensorShape::ColumnMajorMatrix | TensorShape::RowMajorMatrix => {
                self.elements / self.rows
            }
            _ => self.rows,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.elements == 1
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self.shape,
            TensorShape::ColumnVector | TensorShape::RowVector
        )
    }

    /// Whether elements are stored as a full column-major matrix.
    pub fn has_normal_order(&self) -> bool {
        matches!(
            self.shape,
            TensorShape::ColumnVector | TensorShape::RowVector | TensorShape::ColumnMajorMatrix
        )
    }

    /// Reshape to a full column-major matrix with the same number of elements.
    pub fn reshape(&mut self, rows: usize, columns: usize) -> Result<()> {
        if rows == 0 || rows * columns != self.elements {
            return Err(Error::TensorElementsMismatch {
                expected: self.elements,
                got: rows * columns,
            });
        }
        *self = Tensor::matrix(rows, columns);
        Ok(())
    }

    /// Transposing a tensor only changes its shape, never the element order.
    pub fn transpose(&mut self) {
        let (shape, rows) = match self.shape {
            TensorShape::ColumnVector => (TensorShape::RowVector, 1),
            TensorShape::RowVector => (TensorShape::ColumnVector, self.elements),
            TensorShape::ColumnMajorMatrix => (TensorShape::RowMajorMatrix, self.columns()),
            TensorShape::RowMajorMatrix => (TensorShape::ColumnMajorMatrix, self.columns()),
            TensorShape::UpperTriangularMatrix => (TensorShape::LowerTriangularMatrix, self.rows),
            TensorShape::LowerTriangularMatrix => (TensorShape::UpperTriangularMatrix, self.rows),
            shape => (shape, self.rows),
        };
        if self.elements == 1 {
            *self = Tensor::scalar();
        } else {
            self.shape = shape;
            self.rows = rows;
        }
    }

    /// The storage index of element (`row`, `column`), if it is stored at all.
    ///
    /// Entries of symmetric matrices below the diagonal map to their mirror above it.
    pub fn index(&self, row: usize, column: usize) -> Option<usize> {
        let n = self.rows;
        // Storage index of the strictly upper element (i, j), i < j, after the diagonal.
        let upper = |i: usize, j: usize| n + j * (j - 1) / 2 + i;
        match self.shape {
            TensorShape::ColumnVector | TensorShape::ColumnMajorMatrix => {
                Some(column * self.rows + row)
            }
            TensorShape::RowVector => Some(column),
            TensorShape::RowMajorMatrix => Some(row * self.columns() + column),
            TensorShape::DiagonalMatrix => (row == column).then_some(row),
            TensorShape::SymmetricMatrix => Some(match row.cmp(&column) {
                core::cmp::Ordering::Equal => row,
                core::cmp::Ordering::Less => upper(row, column),
                core::cmp::Ordering::Greater => upper(column, row),
            }),
            TensorShape::UpperTriangularMatrix => match row.cmp(&column) {
                core::cmp::Ordering::Equal => Some(row),
                core::cmp::Ordering::Less => Some(upper(row, column)),
                core::cmp::Ordering::Greater => None,
            },
            // Rows of the strict lower triangle are enumerated in order, as are upper columns.
            TensorShape::LowerTriangularMatrix => match row.cmp(&column) {
                core::cmp::Ordering::Equal => Some(row),
                core::cmp::Ordering::Greater => Some(upper(column, row)),
                core::cmp::Ordering::Less => None,
            },
        }
    }

    /// For each element of the equivalent full column-major matrix, where to find its value.
    pub fn look_up_table(&self) -> Vec<TensorLookup> {
        let (rows, columns) = (self.rows, self.columns());
        let mut table = Vec::with_capacity(rows * columns);
        for column in 0..columns {
            for row in 0..rows {
                table.push(match self.index(row, column) {
                    Some(index) => TensorLookup::Sample(index),
                    None => TensorLookup::Zero,
                });
            }
        }
        table
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor::scalar()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{} {:?}", self.rows, self.columns(), self.shape)
    }
}
