use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use glob::glob;
use image::{DynamicImage, GenericImageView};
use rand::rng;
use rand::seq::SliceRandom;
use tokio::fs;

use crate::config::{ImageLimits, OrderKind, SourceConfig};

/// Photos found by a glob, decoded on demand.
pub struct FilesystemImageSource {
    pub paths: Vec<PathBuf>,
    pub order: OrderKind,
}

impl FilesystemImageSource {
    /// Expand the configured glob once and apply the configured order.
    pub fn new(cfg: &SourceConfig) -> Result<Self> {
        let pattern = cfg
            .glob
            .clone()
            .ok_or_else(|| anyhow::anyhow!("source is missing a glob"))?;
        tracing::info!(pattern = %pattern, "evaluating glob for filesystem source");
        let mut paths: Vec<PathBuf> = glob(&pattern)
            .with_context(|| format!("evaluating glob {pattern}"))?
            .flatten()
            .filter(|p| p.is_file())
            .collect();
        if paths.is_empty() {
            tracing::warn!(pattern = %pattern, "no files matched source glob");
        }

        let order = cfg.order.unwrap_or_default();
        match order {
            OrderKind::Sequential => paths.sort(),
            OrderKind::Random => paths.shuffle(&mut rng()),
        }
        tracing::info!(pattern = %pattern, total = paths.len(), ?order, "filesystem source loaded");
        Ok(Self { paths, order })
    }

    /// Decode up to `limit` images in source order. Files that fail to read or
    /// decode are skipped with a warning.
    pub async fn load(
        &self,
        limit: usize,
        limits: Option<&ImageLimits>,
    ) -> Result<Vec<Arc<DynamicImage>>> {
        let mut out = Vec::with_capacity(limit.min(self.paths.len()));
        for path in &self.paths {
            if out.len() == limit {
                break;
            }
            match load_one(path, limits).await {
                Ok(img) => {
                    tracing::trace!(path = %path.display(), dims = ?img.dimensions(), "decoded image");
                    out.push(Arc::new(img));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping image");
                }
            }
        }
        if out.len() < limit {
            tracing::debug!(
                loaded = out.len(),
                wanted = limit,
                "fewer images than grid cells"
            );
        }
        Ok(out)
    }
}

async fn load_one(path: &Path, limits: Option<&ImageLimits>) -> Result<DynamicImage> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mut img = image::load_from_memory(&bytes)
        .with_context(|| format!("decoding {}", path.display()))?;
    if let Some(tag) = extract_exif_orientation(&bytes) {
        img = apply_exif_orientation(img, tag);
    }
    Ok(downscale_to_limits(img, limits))
}

/// Parse EXIF orientation (1,3,6,8) from raw image bytes, if present.
fn extract_exif_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = std::io::Cursor::new(bytes);
    let reader = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = reader.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    match field.value {
        exif::Value::Short(ref v) => v.first().copied(),
        _ => field.value.get_uint(0).and_then(|v| u16::try_from(v).ok()),
    }
}

/// Rotate into view orientation. Mirrored tags (2,4,5,7) are left as-is.
fn apply_exif_orientation(img: DynamicImage, tag: u16) -> DynamicImage {
    match tag {
        3 => img.rotate180(),
        6 => img.rotate90(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn downscale_to_limits(img: DynamicImage, limits: Option<&ImageLimits>) -> DynamicImage {
    let Some(l) = limits else {
        return img;
    };
    let (w, h) = img.dimensions();
    let mw = l.max_width.unwrap_or(w);
    let mh = l.max_height.unwrap_or(h);
    if w <= mw && h <= mh {
        return img;
    }
    // resize preserves aspect ratio and fits inside the box
    img.resize(mw, mh, image::imageops::FilterType::CatmullRom)
}
