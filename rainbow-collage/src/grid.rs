//! Diagonal snake placement.
//!
//! Items arrive in color order and are laid along alternating anti-diagonals
//! (up-right, then down-left) of a `width` x `height` grid, so neighbours in
//! the sequence stay neighbours in both grid directions. The grid is then read
//! back row-major, which lets downstream code address cell `(row, col)` as
//! `row * width + col`.

use crate::error::CollageError;

/// Check `width` x `height` against the number of items.
pub fn check_dimensions(width: u32, height: u32, len: usize) -> Result<usize, CollageError> {
    if width == 0 || height == 0 {
        return Err(CollageError::EmptyGrid { width, height });
    }
    let cells = (width as usize)
        .checked_mul(height as usize)
        .filter(|&cells| cells == len);
    cells.ok_or(CollageError::GridSizeMismatch {
        width,
        height,
        entries: len,
    })
}

/// Row-major cell index of every position in the diagonal walk, in walk order.
pub fn diagonal_walk(width: usize, height: usize) -> Vec<usize> {
    let cells = width * height;
    let mut walk = Vec::with_capacity(cells);
    let (mut row, mut col) = (0usize, 0usize);
    let mut up_right = true;

    while walk.len() < cells {
        walk.push(row * width + col);

        let blocked = if up_right {
            row == 0 || col + 1 == width
        } else {
            row + 1 == height || col == 0
        };
        if blocked {
            if up_right {
                if col + 1 == width {
                    row += 1;
                } else {
                    col += 1;
                }
            } else if row + 1 == height {
                col += 1;
            } else {
                row += 1;
            }
            up_right = !up_right;
        } else if up_right {
            row -= 1;
            col += 1;
        } else {
            row += 1;
            col -= 1;
        }
    }
    walk
}

/// Permute `items` (already in sorted order) into the row-major layout of the
/// diagonal walk.
pub fn arrange<T>(items: Vec<T>, width: u32, height: u32) -> Result<Vec<T>, CollageError> {
    check_dimensions(width, height, items.len())?;
    let walk = diagonal_walk(width as usize, height as usize);

    let mut cells: Vec<Option<T>> = std::iter::repeat_with(|| None).take(items.len()).collect();
    for (item, cell) in items.into_iter().zip(walk) {
        cells[cell] = Some(item);
    }
    // every index in 0..w*h is visited exactly once by the walk
    Ok(cells.into_iter().flatten().collect())
}
