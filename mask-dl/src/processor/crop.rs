use super::{ensure_pair, sample_scaled_extent};
use crate::{common::*, utils::TensorExt as _};

/// Random crop operator initializer. Scales are fractions of the input's
/// own height and width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomCropInit {
    pub min_scale: Option<R64>,
    pub max_scale: Option<R64>,
}

impl RandomCropInit {
    pub fn build(self) -> Result<RandomCrop> {
        let bounds = CropBounds::validate(self.min_scale, self.max_scale)?;
        Ok(RandomCrop { bounds })
    }
}

/// Upper-left crop operator initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpperLeftCropInit {
    pub min_scale: Option<R64>,
    pub max_scale: Option<R64>,
}

impl UpperLeftCropInit {
    pub fn build(self) -> Result<UpperLeftCrop> {
        let bounds = CropBounds::validate(self.min_scale, self.max_scale)?;
        Ok(UpperLeftCrop { bounds })
    }
}

/// Extracts one randomly sized window at a random offset, identically from
/// an image and its mask.
#[derive(Debug, Clone)]
pub struct RandomCrop {
    bounds: CropBounds,
}

/// Extracts one randomly sized window whose origin is pinned to `(0, 0)`.
#[derive(Debug, Clone)]
pub struct UpperLeftCrop {
    bounds: CropBounds,
}

/// Parameters of one crop call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropParams {
    pub top: i64,
    pub left: i64,
    pub height: i64,
    pub width: i64,
}

#[derive(Debug, Clone)]
struct CropBounds {
    min_scale: Option<f64>,
    max_scale: Option<f64>,
}

impl CropBounds {
    fn validate(min_scale: Option<R64>, max_scale: Option<R64>) -> Result<Self> {
        if let Some(min) = min_scale {
            ensure!(min > 0.0, "min_scale must be positive");
        }
        if let (Some(min), Some(max)) = (min_scale, max_scale) {
            ensure!(min <= max, "min_scale must not exceed max_scale");
        }
        Ok(Self {
            min_scale: min_scale.map(R64::raw),
            max_scale: max_scale.map(R64::raw),
        })
    }

    /// Sample a window size, clamped to the input extent.
    fn sample_size(&self, rng: &mut impl Rng, (height, width): (i64, i64)) -> Result<(i64, i64)> {
        let (min, max) = match (self.min_scale, self.max_scale) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(
                    AugError::configuration("min_scale and max_scale must be provided").into(),
                )
            }
        };
        let crop_h = sample_scaled_extent(rng, min, max, height).min(height);
        let crop_w = sample_scaled_extent(rng, min, max, width).min(width);
        Ok((crop_h, crop_w))
    }
}

impl RandomCrop {
    pub fn sample(&self, rng: &mut impl Rng, (height, width): (i64, i64)) -> Result<CropParams> {
        let (crop_h, crop_w) = self.bounds.sample_size(rng, (height, width))?;
        Ok(CropParams {
            top: rng.gen_range(0..=(height - crop_h)),
            left: rng.gen_range(0..=(width - crop_w)),
            height: crop_h,
            width: crop_w,
        })
    }

    pub fn forward(
        &self,
        image: &Tensor,
        mask: &Tensor,
        rng: &mut impl Rng,
    ) -> Result<(Tensor, Tensor)> {
        let hw = ensure_pair(image, mask)?;
        let params = self.sample(rng, hw)?;
        apply_crop(image, mask, &params)
    }

    pub fn forward_with(
        &self,
        image: &Tensor,
        mask: &Tensor,
        params: &CropParams,
    ) -> Result<(Tensor, Tensor)> {
        ensure_pair(image, mask)?;
        apply_crop(image, mask, params)
    }
}

impl UpperLeftCrop {
    pub fn sample(&self, rng: &mut impl Rng, hw: (i64, i64)) -> Result<CropParams> {
        let (crop_h, crop_w) = self.bounds.sample_size(rng, hw)?;
        Ok(CropParams {
            top: 0,
            left: 0,
            height: crop_h,
            width: crop_w,
        })
    }

    pub fn forward(
        &self,
        image: &Tensor,
        mask: &Tensor,
        rng: &mut impl Rng,
    ) -> Result<(Tensor, Tensor)> {
        let hw = ensure_pair(image, mask)?;
        let params = self.sample(rng, hw)?;
        apply_crop(image, mask, &params)
    }

    pub fn forward_with(
        &self,
        image: &Tensor,
        mask: &Tensor,
        params: &CropParams,
    ) -> Result<(Tensor, Tensor)> {
        ensure_pair(image, mask)?;
        apply_crop(image, mask, params)
    }
}

fn apply_crop(image: &Tensor, mask: &Tensor, params: &CropParams) -> Result<(Tensor, Tensor)> {
    let CropParams {
        top,
        left,
        height,
        width,
    } = *params;
    let new_image = image.f_crop2d(top, left, height, width)?;
    let new_mask = mask.f_crop2d(top, left, height, width)?;
    Ok((new_image, new_mask))
}
