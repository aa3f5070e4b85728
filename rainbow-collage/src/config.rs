use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use css_color::Srgb;
use image::Rgba;
use serde::{Deserialize, Serialize};
use tokio::fs;
use toml_edit::DocumentMut;

use crate::merge::GridMerger;
use crate::sort::BlankPlacement;

#[cfg(feature = "embed_example")]
use rust_embed::RustEmbed;

#[cfg(feature = "embed_example")]
#[derive(RustEmbed)]
#[folder = "../"]
#[include = "rainbow-collage.example.toml"]
struct ConfigAssets;

/// Default on-disk config filename
pub const DEFAULT_CONFIG_PATH: &str = "rainbow-collage.toml";

/// Strongly typed representation of the configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub logging: Option<Logging>,
    /// Optional limits for decoded input images. Larger images are downscaled
    /// (aspect preserved) before color reduction and tiling.
    pub image_limits: Option<ImageLimits>,
    pub collage: CollageConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ImageLimits {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CollageConfig {
    /// Grid columns.
    pub width: u32,
    /// Grid rows.
    pub height: u32,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub blank_placement: BlankPlacement,
    pub tile: Option<TileConfig>,
}

fn default_output() -> PathBuf {
    PathBuf::from("collage.png")
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TileConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Any CSS color; fills blank cells.
    pub background: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    #[default]
    Sequential,
    Random,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SourceConfig {
    pub glob: Option<String>,
    pub order: Option<OrderKind>,
}

impl TileConfig {
    /// Build the stock merger from tile settings.
    pub fn merger(&self) -> Result<GridMerger> {
        let mut merger = GridMerger::default();
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => merger.tile_size = Some((w, h)),
            (None, None) => {}
            (w, h) => bail!("tile size must give both width and height > 0, got {w:?}x{h:?}"),
        }
        if let Some(bg) = &self.background {
            merger.background = parse_color(bg)?;
        }
        Ok(merger)
    }
}

/// Parse a CSS color string into an RGBA pixel.
pub fn parse_color(text: &str) -> Result<Rgba<u8>> {
    let parsed = text
        .parse::<Srgb>()
        .map_err(|_| anyhow::anyhow!("invalid CSS color '{text}'"))?;
    let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    let px = Rgba([
        to_u8(parsed.red),
        to_u8(parsed.green),
        to_u8(parsed.blue),
        to_u8(parsed.alpha),
    ]);
    tracing::trace!(input=%text, r=px[0], g=px[1], b=px[2], a=px[3], "resolved color");
    Ok(px)
}

/// Loaded config document together with where it came from.
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    doc: DocumentMut,
}

impl ConfigManager {
    /// Load the config file. If it does not exist, it is created from the embedded example.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        if !path.exists() {
            #[cfg(feature = "embed_example")]
            {
                let Some(example_file) = ConfigAssets::get("rainbow-collage.example.toml") else {
                    bail!(
                        "config file {} not found and embedded example is not available",
                        path.display()
                    );
                };
                let example_content = std::str::from_utf8(&example_file.data)
                    .with_context(|| "embedded example config is not valid UTF-8")?;
                fs::write(&path, example_content)
                    .await
                    .with_context(|| format!("writing example config to {}", path.display()))?;
                tracing::warn!(path = %path.display(), "created default config file; edit it to point at your photos");
            }
            #[cfg(not(feature = "embed_example"))]
            {
                bail!("config file {} not found", path.display());
            }
        }

        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading config file {}", path.display()))?;
        let doc = text
            .parse::<DocumentMut>()
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert the document to the strongly typed struct.
    pub fn to_struct(&self) -> Result<Config> {
        let typed: Config = toml_edit::de::from_document(self.doc.clone())
            .with_context(|| format!("invalid config in {}", self.path.display()))?;
        if typed.collage.width == 0 || typed.collage.height == 0 {
            bail!(
                "collage grid must be at least 1x1, got {}x{}",
                typed.collage.width,
                typed.collage.height
            );
        }
        Ok(typed)
    }
}
