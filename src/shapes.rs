//! Rectangular stamp patterns.

use crate::error::{Error, Result};

/// A fixed rectangular boolean template, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    name: String,
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Shape {
    /// Builds a shape from text rows.
    ///
    /// `O`, `o`, `*` and `#` are alive, `.` and space are dead. Short rows
    /// are padded with dead cells.
    pub fn from_rows(name: &str, rows: &[&str]) -> Result<Self> {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(Error::Shape(format!("{name:?} has no cells")));
        }

        let mut cells = vec![false; width * height];
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                cells[y * width + x] = match c {
                    'O' | 'o' | '*' | '#' => true,
                    '.' | ' ' => false,
                    other => {
                        return Err(Error::Shape(format!(
                            "{name:?} has unexpected glyph {other:?} at ({x}, {y})"
                        )))
                    }
                };
            }
        }

        Ok(Self {
            name: name.to_owned(),
            width,
            height,
            cells,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether pattern cell `(px, py)` is set; `false` outside the pattern.
    pub fn get(&self, px: usize, py: usize) -> bool {
        px < self.width && py < self.height && self.cells[py * self.width + px]
    }

    /// Offsets of the live pattern cells.
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height)
            .flat_map(move |py| (0..self.width).map(move |px| (px, py)))
            .filter(|&(px, py)| self.get(px, py))
    }
}
