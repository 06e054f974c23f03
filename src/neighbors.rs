//! Moore neighborhood counting on a torus.

use crate::cells::Cells;

/// Counts the living neighbors of `(x, y)`.
///
/// The grid is treated as toroidal, meaning the edges wrap around to the
/// opposite side, so every one of the 8 offsets resolves to a valid cell.
/// On grids one cell wide or tall an offset can land on the cell itself and
/// is still counted.
///
/// # Returns
///
/// The number of live neighbors (0-8)
pub fn count_neighbors(cells: &Cells, x: usize, y: usize) -> u8 {
    let cols = cells.cols();
    let rows = cells.rows();

    let left = if x > 0 { x - 1 } else { cols - 1 };
    let right = if x + 1 < cols { x + 1 } else { 0 };
    let up = if y > 0 { y - 1 } else { rows - 1 };
    let down = if y + 1 < rows { y + 1 } else { 0 };

    [
        (left, up),
        (left, y),
        (left, down),
        (x, up),
        (x, down),
        (right, up),
        (right, y),
        (right, down),
    ]
    .iter()
    .filter(|&&(nx, ny)| cells.get(nx, ny))
    .count() as u8
}
