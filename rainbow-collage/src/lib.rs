//! Rainbow photo collages.
//!
//! Images are reduced to their mean color, sorted by HSV and laid out along a
//! diagonal snake so that color gradients run smoothly across both grid axes.
//! Compositing is delegated to a [`TileMerger`].

pub mod collage;
pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod merge;
pub mod sort;
pub mod sources;

pub use collage::{CollageParams, build};
pub use color::ColorKey;
pub use error::CollageError;
pub use merge::{GridCell, GridMerger, MergeError, TileMerger};
pub use sort::{BlankPlacement, Entry, ImageHandle};
