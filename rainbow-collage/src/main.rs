use std::path::PathBuf;

use anyhow::Context;
use rainbow_collage::config;
use rainbow_collage::sources::FilesystemImageSource;
use rainbow_collage::{CollageParams, ImageHandle};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config first so we can honor logging.filter directive.
    let cfg_path = std::env::args_os().nth(1).map(PathBuf::from);
    let manager = config::ConfigManager::load(cfg_path).await?;
    let cfg = manager.to_struct()?;
    let filter_directive = cfg
        .logging
        .as_ref()
        .and_then(|l| l.filter.clone())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info,rainbow_collage=debug".to_string());
    fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .init();
    tracing::debug!(path = %manager.path().display(), "config loaded");

    let (width, height) = (cfg.collage.width, cfg.collage.height);
    let cells = (width as usize)
        .checked_mul(height as usize)
        .context("grid size overflows")?;

    let source = FilesystemImageSource::new(&cfg.source)?;
    if source.paths.len() > cells {
        tracing::warn!(
            found = source.paths.len(),
            cells,
            "more photos than grid cells; extra photos are left out"
        );
    }
    let loaded = source.load(cells, cfg.image_limits.as_ref()).await?;
    let mut images: Vec<ImageHandle> = loaded.into_iter().map(Some).collect();
    images.resize(cells, None);

    let merger = cfg.collage.tile.clone().unwrap_or_default().merger()?;
    let collage = rainbow_collage::build(CollageParams {
        images,
        width,
        height,
        blanks: cfg.collage.blank_placement,
        merger: &merger,
    })
    .await?;

    let output = &cfg.collage.output;
    collage
        .save(output)
        .with_context(|| format!("saving {}", output.display()))?;
    tracing::info!(path = %output.display(), "collage written");
    Ok(())
}
