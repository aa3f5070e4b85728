use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::color::{ColorKey, ReduceError};
use crate::error::CollageError;

/// Caller-owned, read-only image. `None` marks an intentionally blank cell.
pub type ImageHandle = Option<Arc<DynamicImage>>;

/// Where blank cells go in the sorted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlankPlacement {
    /// After every image, i.e. at the tail of the diagonal walk (default).
    #[default]
    Last,
    /// Before every image, i.e. starting from the top-left corner.
    First,
}

/// One image travelling through sort and placement together with its key.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub image: ImageHandle,
    /// Zero until [`sort_by_hsv`] fills it in; stays zero for blanks.
    pub color: ColorKey,
}

impl Entry {
    pub fn new(image: ImageHandle) -> Self {
        Self {
            image,
            color: ColorKey::default(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.image.is_none()
    }

    /// Total order used by the sorter: blanks grouped per `blanks`, images by HSV.
    pub fn cmp_with(&self, other: &Self, blanks: BlankPlacement) -> Ordering {
        match (self.is_blank(), other.is_blank()) {
            (true, true) => Ordering::Equal,
            (true, false) => match blanks {
                BlankPlacement::Last => Ordering::Greater,
                BlankPlacement::First => Ordering::Less,
            },
            (false, true) => match blanks {
                BlankPlacement::Last => Ordering::Less,
                BlankPlacement::First => Ordering::Greater,
            },
            (false, false) => self.color.cmp_hsv(&other.color),
        }
    }
}

/// Compute every entry's color key in parallel, then sort the slice in place.
pub async fn sort_by_hsv(
    entries: &mut [Entry],
    blanks: BlankPlacement,
) -> Result<(), CollageError> {
    compute_keys(entries, ColorKey::from_image).await?;
    entries.sort_unstable_by(|a, b| a.cmp_with(b, blanks));
    Ok(())
}

/// Fill in `color` for every non-blank entry using `reduce`.
///
/// One blocking task is spawned per non-blank entry before any is awaited.
/// Each task returns the key for its own index; keys are written back only to
/// that slot. Every task is joined before returning, even after a failure;
/// the error reported is the one with the lowest index.
async fn compute_keys<F>(entries: &mut [Entry], reduce: F) -> Result<(), CollageError>
where
    F: Fn(&DynamicImage) -> Result<ColorKey, ReduceError> + Send + Sync + 'static,
{
    let started = Instant::now();
    let reduce = Arc::new(reduce);
    let handles: Vec<_> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let image = entry.image.clone()?;
            let reduce = Arc::clone(&reduce);
            let task = tokio::task::spawn_blocking(move || reduce(&image));
            Some((index, task))
        })
        .collect();
    let spawned = handles.len();

    let mut first_error = None;
    for (index, task) in handles {
        let key = match task.await {
            Ok(Ok(key)) => key,
            Ok(Err(source)) => {
                first_error.get_or_insert(CollageError::InvalidImage { index, source });
                continue;
            }
            Err(source) => {
                first_error.get_or_insert(CollageError::Worker { index, source });
                continue;
            }
        };
        entries[index].color = key;
    }
    if let Some(err) = first_error {
        tracing::debug!(workers = spawned, error = %err, "color key computation failed");
        return Err(err);
    }
    tracing::debug!(
        entries = entries.len(),
        workers = spawned,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "computed color keys"
    );
    Ok(())
}
