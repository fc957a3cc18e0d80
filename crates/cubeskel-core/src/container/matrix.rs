use super::DistributedData;
use crate::{ContainerError, Element, distribution::Layout};
use cubeskel_runtime::server::ComputeServer;

/// A row-major two dimensional distributed container.
///
/// Block and overlap distributions split a matrix by whole rows.
#[derive(Debug)]
pub struct Matrix<T: Element, S: ComputeServer> {
    data: DistributedData<T, S>,
    rows: usize,
    cols: usize,
}

impl<T: Element, S: ComputeServer> Matrix<T, S> {
    /// A `rows` x `cols` matrix holding `values` in row-major order.
    pub fn from_vec(rows: usize, cols: usize, values: Vec<T>) -> Result<Self, ContainerError> {
        let layout = Layout::matrix(rows, cols);
        if values.len() != layout.len {
            return Err(ContainerError::ShapeMismatch {
                rows,
                cols,
                expected: layout.len,
                actual: values.len(),
            });
        }

        Ok(Self {
            data: DistributedData::new(values, layout),
            rows,
            cols,
        })
    }

    /// A `rows` x `cols` matrix of copies of `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: DistributedData::new(vec![value; rows * cols], Layout::matrix(rows, cols)),
            rows,
            cols,
        }
    }

    /// The number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Whether the matrix holds no element.
    pub fn is_empty(&self) -> bool {
        self.data.size() == 0
    }

    /// The element at `(row, col)`.
    pub fn get(&mut self, row: usize, col: usize) -> Result<T, ContainerError> {
        let index = self.index(row, col)?;
        self.data.get(index)
    }

    /// Replaces the element at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<(), ContainerError> {
        let index = self.index(row, col)?;
        self.data.set(index, value)
    }

    /// The elements of `row`.
    pub fn row(&mut self, row: usize) -> Result<&[T], ContainerError> {
        if row >= self.rows {
            return Err(ContainerError::IndexOutOfRange {
                index: row,
                len: self.rows,
            });
        }

        let cols = self.cols;
        let host = self.data.host_data()?;
        Ok(&host[row * cols..(row + 1) * cols])
    }

    /// Resizes to `rows` x `cols`, keeping the overlapping top-left block and filling the rest
    /// with `value`.
    ///
    /// Existing device buffers are dropped.
    pub fn resize(&mut self, rows: usize, cols: usize, value: T) -> Result<(), ContainerError> {
        let (old_rows, old_cols) = self.shape();

        self.data.reshape(Layout::matrix(rows, cols), |host| {
            let mut resized = vec![value; rows * cols];
            let kept = old_cols.min(cols);
            for row in 0..old_rows.min(rows) {
                resized[row * cols..row * cols + kept]
                    .copy_from_slice(&host[row * old_cols..row * old_cols + kept]);
            }
            *host = resized;
        })?;
        self.rows = rows;
        self.cols = cols;

        Ok(())
    }

    /// The elements in row-major order.
    pub fn as_slice(&mut self) -> Result<&[T], ContainerError> {
        self.data.host_data()
    }

    /// The elements in row-major order, mutable. The devices are considered behind afterwards.
    pub fn as_mut_slice(&mut self) -> Result<&mut [T], ContainerError> {
        self.data.host_data_mut()
    }

    /// The elements in row-major order, downloaded if needed.
    pub fn into_vec(self) -> Result<Vec<T>, ContainerError> {
        self.data.into_host()
    }

    fn index(&self, row: usize, col: usize) -> Result<usize, ContainerError> {
        if row >= self.rows || col >= self.cols {
            return Err(ContainerError::IndexOutOfRange {
                index: row * self.cols + col,
                len: self.data.size(),
            });
        }

        Ok(row * self.cols + col)
    }
}

impl<T: Element, S: ComputeServer> core::ops::Deref for Matrix<T, S> {
    type Target = DistributedData<T, S>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T: Element, S: ComputeServer> core::ops::DerefMut for Matrix<T, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}
