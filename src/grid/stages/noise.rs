use crate::error::TableError;
use crate::grid::geometry::{mean_height, BoundingBox};

/// Boxes split into plausible text and height outliers
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseSplit {
    pub clean: Vec<BoundingBox>,
    pub noise: Vec<BoundingBox>,
    /// Mean height over every input box, the reference for the cut
    pub mean_height: f64,
}

/// Separate text boxes from leftover ruling-line and icon fragments.
///
/// Text lines on a page share roughly one height, so a box shorter than
/// `mean_height / divisor` is taken as noise. Every input box lands in exactly
/// one of the two lists, in input order.
pub fn apply(boxes: &[BoundingBox], divisor: f64) -> Result<NoiseSplit, TableError> {
    let mean = mean_height(boxes).ok_or(TableError::EmptyInput)?;
    let cutoff = mean / divisor;

    let (noise, clean): (Vec<_>, Vec<_>) = boxes
        .iter()
        .copied()
        .partition(|b| f64::from(b.height) < cutoff);

    tracing::debug!(
        "Noise filter: mean height {:.2}, cutoff {:.2}, {} clean, {} noise",
        mean,
        cutoff,
        clean.len(),
        noise.len()
    );

    Ok(NoiseSplit {
        clean,
        noise,
        mean_height: mean,
    })
}
