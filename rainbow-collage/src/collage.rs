use std::time::Instant;

use image::RgbaImage;

use crate::error::CollageError;
use crate::grid;
use crate::merge::{GridCell, TileMerger};
use crate::sort::{self, BlankPlacement, Entry, ImageHandle};

/// Everything one collage build needs.
pub struct CollageParams<'a> {
    /// Exactly `width * height` handles; pad with `None` for empty cells.
    pub images: Vec<ImageHandle>,
    pub width: u32,
    pub height: u32,
    pub blanks: BlankPlacement,
    pub merger: &'a dyn TileMerger,
}

/// Sort the images by color, lay them out diagonally and hand the grid to the merger.
///
/// Grid dimensions are validated before any pixel is read. Merger errors are
/// returned as-is.
pub async fn build(params: CollageParams<'_>) -> Result<RgbaImage, CollageError> {
    let CollageParams {
        images,
        width,
        height,
        blanks,
        merger,
    } = params;
    grid::check_dimensions(width, height, images.len())?;
    let started = Instant::now();

    let mut entries: Vec<Entry> = images.into_iter().map(Entry::new).collect();
    sort::sort_by_hsv(&mut entries, blanks).await?;
    let entries = grid::arrange(entries, width, height)?;

    let cells: Vec<GridCell> = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| GridCell {
            row: (i / width as usize) as u32,
            col: (i % width as usize) as u32,
            image: entry.image,
        })
        .collect();
    let blank = cells.iter().filter(|c| c.image.is_none()).count();
    tracing::debug!(width, height, blank, "arranged collage cells");

    let collage = merger.merge(&cells, width, height)?;
    tracing::info!(
        width,
        height,
        px_w = collage.width(),
        px_h = collage.height(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "collage built"
    );
    Ok(collage)
}
