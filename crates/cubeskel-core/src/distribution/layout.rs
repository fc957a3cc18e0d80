use core::ops::Range;

/// Shape of the host data a distribution works on.
///
/// Distributions split data in units of whole rows: a vector has rows of one element, a matrix
/// has rows of `cols` elements.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    /// Total number of elements.
    pub len: usize,
    /// Number of elements in a row.
    pub row_len: usize,
}

impl Layout {
    /// Layout of a vector of `len` elements.
    pub fn vector(len: usize) -> Self {
        Self { len, row_len: 1 }
    }

    /// Layout of a row-major `rows` x `cols` matrix.
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            len: rows * cols,
            row_len: cols,
        }
    }

    /// The number of rows.
    pub fn units(&self) -> usize {
        match self.row_len {
            0 => 0,
            row_len => self.len / row_len,
        }
    }

    /// Converts a range of rows to a range of elements.
    pub fn elements(&self, units: Range<usize>) -> Range<usize> {
        units.start * self.row_len..units.end * self.row_len
    }
}
