//! Synchronized image/mask preprocessing building blocks.
//!
//! Every operator applies one set of sampled parameters to both the image
//! and its mask, so the two can never drift apart. Images are resampled
//! with smoothing filters while masks always use nearest-neighbor.

pub mod center_crop;
pub mod crop;
pub mod crop_resize_pad;
pub mod flip;
pub mod identity;
pub mod perspective;
pub mod resize;
pub mod rotate;

pub use center_crop::*;
pub use crop::*;
pub use crop_resize_pad::*;
pub use flip::*;
pub use identity::*;
pub use perspective::*;
pub use resize::*;
pub use rotate::*;

use crate::{common::*, utils::TensorExt as _};

/// Check that an image and its mask agree on rank and spatial size, and
/// return that size.
pub(crate) fn ensure_pair(image: &Tensor, mask: &Tensor) -> Result<(i64, i64)> {
    ensure!(
        image.dim() == mask.dim(),
        "image rank {} does not match mask rank {}",
        image.dim(),
        mask.dim()
    );
    let image_hw = image.f_spatial_size()?;
    let mask_hw = mask.f_spatial_size()?;
    ensure!(
        image_hw == mask_hw,
        "image size {:?} does not match mask size {:?}",
        image_hw,
        mask_hw
    );
    Ok(image_hw)
}

/// Sample an integer extent in `[min_scale * extent, max_scale * extent]`
/// inclusive, at least one pixel.
pub(crate) fn sample_scaled_extent(
    rng: &mut impl Rng,
    min_scale: f64,
    max_scale: f64,
    extent: i64,
) -> i64 {
    let lower = (min_scale * extent as f64) as i64;
    let upper = (max_scale * extent as f64) as i64;
    rng.gen_range(lower..=upper).max(1)
}

/// Truncate a fractional extent to pixels, at least one.
pub(crate) fn scaled_extent(scale: f64, extent: i64) -> i64 {
    ((scale * extent as f64) as i64).max(1)
}
