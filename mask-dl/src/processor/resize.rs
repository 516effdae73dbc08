use super::{ensure_pair, sample_scaled_extent, scaled_extent};
use crate::{
    common::*,
    utils::{Interpolation, TensorExt as _},
};

/// Resize operator initializer. Scales are fractions of the input's own
/// height and width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomResizeInit {
    pub min_scale: Option<R64>,
    pub max_scale: Option<R64>,
}

impl RandomResizeInit {
    pub fn build(self) -> Result<RandomResize> {
        let Self {
            min_scale,
            max_scale,
        } = self;

        if let Some(min) = min_scale {
            ensure!(min > 0.0, "min_scale must be positive");
        }
        if let (Some(min), Some(max)) = (min_scale, max_scale) {
            ensure!(min <= max, "min_scale must not exceed max_scale");
        }

        Ok(RandomResize {
            min_scale: min_scale.map(R64::raw),
            max_scale: max_scale.map(R64::raw),
        })
    }
}

/// Rescales an image and its mask to one shared randomly sampled target
/// size. The image is filtered bilinearly; the mask uses nearest-neighbor
/// so label values survive.
#[derive(Debug, Clone)]
pub struct RandomResize {
    min_scale: Option<f64>,
    max_scale: Option<f64>,
}

/// Parameters of one resize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeParams {
    pub target_hw: [i64; 2],
}

impl ResizeParams {
    /// Target size from a single isotropic scale fraction.
    pub fn isotropic(scale: f64, (height, width): (i64, i64)) -> Result<Self> {
        ensure!(scale > 0.0, "scale must be positive, but get {}", scale);
        Ok(Self {
            target_hw: [scaled_extent(scale, height), scaled_extent(scale, width)],
        })
    }
}

impl RandomResize {
    pub fn sample(&self, rng: &mut impl Rng, (height, width): (i64, i64)) -> Result<ResizeParams> {
        let (min, max) = match (self.min_scale, self.max_scale) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(
                    AugError::configuration("min_scale and max_scale must be provided").into(),
                )
            }
        };
        Ok(ResizeParams {
            target_hw: [
                sample_scaled_extent(rng, min, max, height),
                sample_scaled_extent(rng, min, max, width),
            ],
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
        self.forward_with(image, mask, &params)
    }

    pub fn forward_with(
        &self,
        image: &Tensor,
        mask: &Tensor,
        params: &ResizeParams,
    ) -> Result<(Tensor, Tensor)> {
        ensure_pair(image, mask)?;
        let [target_h, target_w] = params.target_hw;
        let new_image = image.f_resize2d(target_h, target_w, Interpolation::Bilinear)?;
        let new_mask = mask.f_resize2d(target_h, target_w, Interpolation::Nearest)?;
        Ok((new_image, new_mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_matches_params() {
        let resize = RandomResizeInit {
            min_scale: Some(r64(0.5)),
            max_scale: Some(r64(1.0)),
        }
        .build()
        .unwrap();
        let image = Tensor::rand(&[3, 20, 30], tch::kind::FLOAT_CPU);
        let mask = Tensor::zeros(&[1, 20, 30], tch::kind::FLOAT_CPU);

        let mut rng = StdRng::seed_from_u64(11);
        let params = resize.sample(&mut rng, (20, 30)).unwrap();
        let [target_h, target_w] = params.target_hw;
        assert!((10..=20).contains(&target_h));
        assert!((15..=30).contains(&target_w));

        let (new_image, new_mask) = resize.forward_with(&image, &mask, &params).unwrap();
        assert_eq!(new_image.size(), &[3, target_h, target_w]);
        assert_eq!(new_mask.size(), &[1, target_h, target_w]);
    }

    #[test]
    fn isotropic_scale() {
        let resize = RandomResizeInit {
            min_scale: Some(r64(0.5)),
            max_scale: Some(r64(1.0)),
        }
        .build()
        .unwrap();
        let image = Tensor::rand(&[3, 16, 24], tch::kind::FLOAT_CPU);
        let mask = Tensor::ones(&[1, 16, 24], tch::kind::FLOAT_CPU);
        let params = ResizeParams::isotropic(0.5, (16, 24)).unwrap();
        let (new_image, new_mask) = resize.forward_with(&image, &mask, &params).unwrap();
        assert_eq!(new_image.size(), &[3, 8, 12]);
        assert_eq!(new_mask.size(), &[1, 8, 12]);
    }

    #[test]
    fn mask_stays_binary_under_upscale() {
        let resize = RandomResizeInit {
            min_scale: Some(r64(1.0)),
            max_scale: Some(r64(2.0)),
        }
        .build()
        .unwrap();
        let image = Tensor::rand(&[3, 9, 9], tch::kind::FLOAT_CPU);
        let mask = Tensor::rand(&[1, 9, 9], tch::kind::FLOAT_CPU)
            .ge(0.5)
            .to_kind(Kind::Float);
        let mut rng = StdRng::seed_from_u64(3);
        let (new_image, new_mask) = resize.forward(&image, &mask, &mut rng).unwrap();
        let residue = f64::from((&new_mask * (&new_mask - 1.0)).abs().max());
        assert_eq!(residue, 0.0);
        // bilinear image filtering may produce intermediate values; sizes
        // must still agree with the mask
        assert_eq!(&new_image.size()[1..], &new_mask.size()[1..]);
    }

    #[test]
    fn unset_bounds_fail_configuration() {
        let resize = RandomResizeInit {
            min_scale: None,
            max_scale: None,
        }
        .build()
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let error = resize.sample(&mut rng, (10, 10)).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<AugError>(),
            Some(AugError::Configuration(_))
        ));
    }
}
