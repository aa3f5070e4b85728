//! Compositing of the arranged cells into one bitmap.
//!
//! The pipeline only talks to [`TileMerger`]; [`GridMerger`] is the stock
//! implementation that draws every image into an equally sized tile.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::sort::ImageHandle;

/// One cell of the output grid.
#[derive(Debug, Clone)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
    /// `None` leaves the cell empty.
    pub image: ImageHandle,
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("every cell is blank and no tile size is configured")]
    NoTileSize,

    #[error("canvas of {columns}x{rows} tiles of {tile_width}x{tile_height} px overflows")]
    CanvasTooLarge {
        columns: u32,
        rows: u32,
        tile_width: u32,
        tile_height: u32,
    },

    #[error("cell ({row}, {col}) lies outside a {width}x{height} grid")]
    CellOutOfBounds {
        row: u32,
        col: u32,
        width: u32,
        height: u32,
    },

    /// Failure reported by a foreign merger implementation.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Composes grid cells into a single image.
pub trait TileMerger: Send + Sync {
    /// `cells` come in row-major order, one per grid position.
    fn merge(&self, cells: &[GridCell], width: u32, height: u32) -> Result<RgbaImage, MergeError>;
}

/// Tiles every image into a fixed-size cell, scaling it to cover the cell.
#[derive(Debug, Clone)]
pub struct GridMerger {
    /// Explicit tile size; derived from the first non-blank image when `None`.
    pub tile_size: Option<(u32, u32)>,
    pub background: Rgba<u8>,
    pub filter: FilterType,
}

impl Default for GridMerger {
    fn default() -> Self {
        Self {
            tile_size: None,
            background: Rgba([255, 255, 255, 255]),
            filter: FilterType::Triangle,
        }
    }
}

impl GridMerger {
    fn resolve_tile_size(&self, cells: &[GridCell]) -> Result<(u32, u32), MergeError> {
        if let Some(size) = self.tile_size {
            return Ok(size);
        }
        cells
            .iter()
            .find_map(|c| c.image.as_deref())
            .map(|img| img.dimensions())
            .ok_or(MergeError::NoTileSize)
    }
}

impl TileMerger for GridMerger {
    fn merge(&self, cells: &[GridCell], width: u32, height: u32) -> Result<RgbaImage, MergeError> {
        let (tile_w, tile_h) = self.resolve_tile_size(cells)?;
        let too_large = || MergeError::CanvasTooLarge {
            columns: width,
            rows: height,
            tile_width: tile_w,
            tile_height: tile_h,
        };
        let canvas_w = tile_w.checked_mul(width).ok_or_else(too_large)?;
        let canvas_h = tile_h.checked_mul(height).ok_or_else(too_large)?;
        tracing::debug!(
            canvas_w,
            canvas_h,
            tile_w,
            tile_h,
            cells = cells.len(),
            "merging collage"
        );

        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, self.background);
        for cell in cells {
            if cell.row >= height || cell.col >= width {
                return Err(MergeError::CellOutOfBounds {
                    row: cell.row,
                    col: cell.col,
                    width,
                    height,
                });
            }
            let Some(img) = cell.image.as_deref() else {
                continue;
            };
            let x = i64::from(cell.col) * i64::from(tile_w);
            let y = i64::from(cell.row) * i64::from(tile_h);
            if img.dimensions() == (tile_w, tile_h) {
                image::imageops::overlay(&mut canvas, img, x, y);
            } else {
                // scale to cover the tile, cropping the overflow around the center
                let tile = img.resize_to_fill(tile_w, tile_h, self.filter);
                image::imageops::overlay(&mut canvas, &tile, x, y);
            }
        }
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::Arc;

    fn solid(w: u32, h: u32, c: [u8; 3]) -> ImageHandle {
        Some(Arc::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            w,
            h,
            Rgb(c),
        ))))
    }

    fn cells(images: Vec<ImageHandle>, width: u32) -> Vec<GridCell> {
        images
            .into_iter()
            .enumerate()
            .map(|(i, image)| GridCell {
                row: i as u32 / width,
                col: i as u32 % width,
                image,
            })
            .collect()
    }

    #[test]
    fn tile_size_comes_from_first_image() {
        let grid = cells(
            vec![None, solid(10, 6, [255, 0, 0]), solid(3, 3, [0, 255, 0]), None],
            2,
        );
        let out = GridMerger::default().merge(&grid, 2, 2).unwrap();
        assert_eq!(out.dimensions(), (20, 12));
    }

    #[test]
    fn images_land_in_their_cells_and_blanks_keep_background() {
        let grid = cells(
            vec![solid(4, 4, [255, 0, 0]), None, solid(8, 2, [0, 0, 255])],
            3,
        );
        let merger = GridMerger {
            background: Rgba([1, 2, 3, 255]),
            ..GridMerger::default()
        };
        let out = merger.merge(&grid, 3, 1).unwrap();
        assert_eq!(out.dimensions(), (12, 4));
        assert_eq!(*out.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(5, 2), Rgba([1, 2, 3, 255]));
        assert_eq!(*out.get_pixel(10, 3), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn explicit_tile_size_wins() {
        let grid = cells(vec![solid(50, 50, [9, 9, 9])], 1);
        let merger = GridMerger {
            tile_size: Some((5, 7)),
            ..GridMerger::default()
        };
        let out = merger.merge(&grid, 1, 1).unwrap();
        assert_eq!(out.dimensions(), (5, 7));
        assert_eq!(*out.get_pixel(4, 6), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn all_blank_without_tile_size_fails() {
        let grid = cells(vec![None, None], 2);
        let err = GridMerger::default().merge(&grid, 2, 1).unwrap_err();
        assert!(matches!(err, MergeError::NoTileSize));
    }

    #[test]
    fn oversized_canvas_fails() {
        let grid = cells(vec![None], 1);
        let merger = GridMerger {
            tile_size: Some((u32::MAX, 1)),
            ..GridMerger::default()
        };
        let err = merger.merge(&grid, 2, 1).unwrap_err();
        assert!(matches!(err, MergeError::CanvasTooLarge { columns: 2, .. }));
    }

    #[test]
    fn out_of_bounds_cell_fails() {
        let grid = vec![GridCell {
            row: 3,
            col: 0,
            image: solid(2, 2, [0, 0, 0]),
        }];
        let err = GridMerger::default().merge(&grid, 1, 1).unwrap_err();
        assert!(matches!(err, MergeError::CellOutOfBounds { row: 3, .. }));
    }

    #[test]
    fn exact_size_tiles_are_copied_pixel_for_pixel() {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([10, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 20, 0]));
        img.put_pixel(0, 1, Rgb([0, 0, 30]));
        img.put_pixel(1, 1, Rgb([40, 40, 40]));
        let grid = cells(
            vec![None, Some(Arc::new(DynamicImage::ImageRgb8(img)))],
            2,
        );
        let merger = GridMerger {
            tile_size: Some((2, 2)),
            ..GridMerger::default()
        };
        let out = merger.merge(&grid, 2, 1).unwrap();
        assert_eq!(*out.get_pixel(2, 0), Rgba([10, 0, 0, 255]));
        assert_eq!(*out.get_pixel(3, 0), Rgba([0, 20, 0, 255]));
        assert_eq!(*out.get_pixel(2, 1), Rgba([0, 0, 30, 255]));
        assert_eq!(*out.get_pixel(3, 1), Rgba([40, 40, 40, 255]));
    }
}
