use super::ensure_pair;
use crate::{
    common::*,
    utils::{Interpolation, TensorExt as _},
};

/// Deterministic pre-transform: scale the shorter side to `target_size`
/// (image bilinear, mask nearest), then take the centered
/// `target_size` x `target_size` window of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeCenterCrop {
    target_size: i64,
}

impl ResizeCenterCrop {
    pub fn new(target_size: usize) -> Result<Self> {
        ensure!(target_size > 0, "target_size must be positive");
        Ok(Self {
            target_size: target_size as i64,
        })
    }

    pub fn target_size(&self) -> i64 {
        self.target_size
    }

    pub fn forward(&self, image: &Tensor, mask: &Tensor) -> Result<(Tensor, Tensor)> {
        let (height, width) = ensure_pair(image, mask)?;
        let target = self.target_size;

        let (new_h, new_w) = if height <= width {
            (
                target,
                ((width as f64) * (target as f64) / (height as f64)).round() as i64,
            )
        } else {
            (
                ((height as f64) * (target as f64) / (width as f64)).round() as i64,
                target,
            )
        };

        let image = image.f_resize2d(new_h, new_w, Interpolation::Bilinear)?;
        let mask = mask.f_resize2d(new_h, new_w, Interpolation::Nearest)?;

        let top = (new_h - target) / 2;
        let left = (new_w - target) / 2;
        let image = image.f_crop2d(top, left, target, target)?;
        let mask = mask.f_crop2d(top, left, target, target)?;
        Ok((image, mask))
    }
}
