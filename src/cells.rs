//! Column-major boolean cell buffer.

/// A `cols × rows` matrix of live/dead cells.
///
/// Cells are stored column by column, so `(x, y)` lives at `x * rows + y`
/// and a whole column is one contiguous slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cells {
    cols: usize,
    rows: usize,
    data: Vec<bool>,
}

impl Cells {
    /// Creates an all-dead buffer.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            data: vec![false; cols * rows],
        }
    }

    /// Builds a buffer from text rows, `O` for alive and anything else dead.
    ///
    /// Mostly useful in tests; every row should have the same length.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut cells = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                cells.set(x, y, c == 'O');
            }
        }
        cells
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        x * self.rows + y
    }

    /// State of `(x, y)`. Panics if out of range.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[self.index(x, y)]
    }

    /// Sets `(x, y)`. Panics if out of range.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        let i = self.index(x, y);
        self.data[i] = alive;
    }

    /// Marks every cell dead.
    pub fn clear(&mut self) {
        self.data.fill(false);
    }

    /// Number of living cells.
    pub fn population(&self) -> usize {
        self.data.iter().filter(|&&c| c).count()
    }

    /// Raw column-major storage.
    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [bool] {
        &mut self.data
    }
}
