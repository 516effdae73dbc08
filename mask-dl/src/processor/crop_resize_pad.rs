use super::{ensure_pair, sample_scaled_extent, scaled_extent};
use crate::{
    common::*,
    utils::{Interpolation, TensorExt as _},
};

/// Crop-resize-pad operator initializer. `resize_*` scales apply to the
/// input extent, `crop_*` scales to the resized extent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CropResizePadInit {
    pub resize_min: Option<R64>,
    pub resize_max: Option<R64>,
    pub crop_min: Option<R64>,
    pub crop_max: Option<R64>,
}

impl CropResizePadInit {
    pub fn build(self) -> Result<CropResizePad> {
        let Self {
            resize_min,
            resize_max,
            crop_min,
            crop_max,
        } = self;

        for (name, bound) in [
            ("resize_min", resize_min),
            ("resize_max", resize_max),
            ("crop_min", crop_min),
            ("crop_max", crop_max),
        ] {
            if let Some(bound) = bound {
                ensure!(bound > 0.0, "{} must be positive", name);
            }
        }
        if let (Some(min), Some(max)) = (resize_min, resize_max) {
            ensure!(min <= max, "resize_min must not exceed resize_max");
        }
        if let (Some(min), Some(max)) = (crop_min, crop_max) {
            ensure!(min <= max, "crop_min must not exceed crop_max");
        }

        Ok(CropResizePad {
            resize_min: resize_min.map(R64::raw),
            resize_max: resize_max.map(R64::raw),
            crop_min: crop_min.map(R64::raw),
            crop_max: crop_max.map(R64::raw),
        })
    }
}

/// Rescales an image and its mask, crops a random sub-window of the
/// result, and re-embeds that window at a random offset into a canvas of
/// the ORIGINAL input size. Uncovered image pixels take a random
/// per-channel color inside the resized batch's value range; uncovered
/// mask pixels are zero.
#[derive(Debug, Clone)]
pub struct CropResizePad {
    resize_min: Option<f64>,
    resize_max: Option<f64>,
    crop_min: Option<f64>,
    crop_max: Option<f64>,
}

/// Geometry of one crop-resize-pad call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropResizePadParams {
    pub resize_hw: [i64; 2],
    pub crop_hw: [i64; 2],
    /// Top-left corner of the crop window inside the resized input.
    pub crop_offset: [i64; 2],
    /// Top-left corner of the re-embedded window inside the output canvas.
    pub pad_offset: [i64; 2],
}

impl CropResizePad {
    pub fn sample(
        &self,
        rng: &mut impl Rng,
        (height, width): (i64, i64),
    ) -> Result<CropResizePadParams> {
        let (resize_min, resize_max) = match (self.resize_min, self.resize_max) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(
                    AugError::configuration("resize_min and resize_max must be provided").into(),
                )
            }
        };
        let (crop_min, crop_max) = match (self.crop_min, self.crop_max) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(
                    AugError::configuration("crop_min and crop_max must be provided").into(),
                )
            }
        };

        let resize_h = sample_scaled_extent(rng, resize_min, resize_max, height);
        let resize_w = sample_scaled_extent(rng, resize_min, resize_max, width);
        let crop_h = sample_scaled_extent(rng, crop_min, crop_max, resize_h).min(resize_h);
        let crop_w = sample_scaled_extent(rng, crop_min, crop_max, resize_w).min(resize_w);

        self.place(
            rng,
            [resize_h, resize_w],
            [crop_h, crop_w],
            (height, width),
        )
    }

    /// Build parameters from an explicit `[resize_h, resize_w, crop_h,
    /// crop_w]` fraction tuple; only the window offsets remain random.
    pub fn params_from_fractions(
        &self,
        rng: &mut impl Rng,
        fractions: [f64; 4],
        (height, width): (i64, i64),
    ) -> Result<CropResizePadParams> {
        let [resize_h_frac, resize_w_frac, crop_h_frac, crop_w_frac] = fractions;
        ensure!(
            fractions.iter().all(|&frac| frac > 0.0),
            "scale fractions must be positive, but get {:?}",
            fractions
        );

        let resize_h = scaled_extent(resize_h_frac, height);
        let resize_w = scaled_extent(resize_w_frac, width);
        let crop_h = scaled_extent(crop_h_frac, resize_h).min(resize_h);
        let crop_w = scaled_extent(crop_w_frac, resize_w).min(resize_w);

        self.place(
            rng,
            [resize_h, resize_w],
            [crop_h, crop_w],
            (height, width),
        )
    }

    fn place(
        &self,
        rng: &mut impl Rng,
        resize_hw: [i64; 2],
        crop_hw: [i64; 2],
        (height, width): (i64, i64),
    ) -> Result<CropResizePadParams> {
        let [resize_h, resize_w] = resize_hw;
        let [crop_h, crop_w] = crop_hw;

        if crop_h > height || crop_w > width {
            return Err(AugError::validation(format!(
                "crop size {}x{} exceeds the {}x{} output canvas",
                crop_h, crop_w, height, width
            ))
            .into());
        }

        Ok(CropResizePadParams {
            resize_hw,
            crop_hw,
            crop_offset: [
                rng.gen_range(0..=(resize_h - crop_h)),
                rng.gen_range(0..=(resize_w - crop_w)),
            ],
            pad_offset: [
                rng.gen_range(0..=(height - crop_h)),
                rng.gen_range(0..=(width - crop_w)),
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
        self.forward_with(image, mask, &params, rng)
    }

    /// Apply explicit geometry. The rng only drives the fill color; a
    /// seeded generator makes the whole call reproducible.
    pub fn forward_with(
        &self,
        image: &Tensor,
        mask: &Tensor,
        params: &CropResizePadParams,
        rng: &mut impl Rng,
    ) -> Result<(Tensor, Tensor)> {
        tch::no_grad(|| {
            let (height, width) = ensure_pair(image, mask)?;
            let CropResizePadParams {
                resize_hw: [resize_h, resize_w],
                crop_hw: [crop_h, crop_w],
                crop_offset: [crop_top, crop_left],
                pad_offset: [pad_top, pad_left],
            } = *params;

            let crop_h = crop_h.min(resize_h);
            let crop_w = crop_w.min(resize_w);
            if crop_h > height || crop_w > width {
                return Err(AugError::validation(format!(
                    "crop size {}x{} exceeds the {}x{} output canvas",
                    crop_h, crop_w, height, width
                ))
                .into());
            }
            if crop_top + crop_h > resize_h
                || crop_left + crop_w > resize_w
                || pad_top + crop_h > height
                || pad_left + crop_w > width
            {
                return Err(AugError::validation(format!(
                    "window offsets {:?} are inconsistent with sizes {:?}",
                    (crop_top, crop_left, pad_top, pad_left),
                    ((resize_h, resize_w), (crop_h, crop_w), (height, width)),
                ))
                .into());
            }

            let batched = image.dim() == 4;
            let image4 = if batched {
                image.shallow_clone()
            } else {
                image.unsqueeze(0)
            };
            let mask4 = if batched {
                mask.shallow_clone()
            } else {
                mask.unsqueeze(0)
            };

            let resized_image = if (resize_h, resize_w) == (height, width) {
                image4
            } else {
                image4.f_resize2d(resize_h, resize_w, Interpolation::Bilinear)?
            };
            let resized_mask = if (resize_h, resize_w) == (height, width) {
                mask4
            } else {
                mask4.f_resize2d(resize_h, resize_w, Interpolation::Nearest)?
            };

            let cropped_image = resized_image.f_crop2d(crop_top, crop_left, crop_h, crop_w)?;
            let cropped_mask = resized_mask.f_crop2d(crop_top, crop_left, crop_h, crop_w)?;

            let (bsize, channels, _, _) = cropped_image.size4()?;
            let mask_channels = cropped_mask.size4()?.1;

            // random per-channel fill inside the resized batch's value range
            let min_val = f64::from(resized_image.min());
            let max_val = f64::from(resized_image.max());
            let fill: Vec<f64> = (0..(bsize * channels))
                .map(|_| {
                    if max_val > min_val {
                        rng.gen_range(min_val..max_val)
                    } else {
                        min_val
                    }
                })
                .collect();

            let canvas = Tensor::of_slice(&fill)
                .view([bsize, channels, 1, 1])
                .to_kind(image.kind())
                .to_device(image.device())
                .repeat(&[1, 1, height, width]);
            let mask_canvas = Tensor::zeros(
                &[bsize, mask_channels, height, width],
                (mask.kind(), mask.device()),
            );

            canvas
                .narrow(2, pad_top, crop_h)
                .narrow(3, pad_left, crop_w)
                .copy_(&cropped_image);
            mask_canvas
                .narrow(2, pad_top, crop_h)
                .narrow(3, pad_left, crop_w)
                .copy_(&cropped_mask);

            if batched {
                Ok((canvas, mask_canvas))
            } else {
                Ok((
                    canvas.reshape(&[channels, height, width]),
                    mask_canvas.reshape(&[mask_channels, height, width]),
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator() -> CropResizePad {
        CropResizePadInit {
            resize_min: Some(r64(0.5)),
            resize_max: Some(r64(1.0)),
            crop_min: Some(r64(0.3)),
            crop_max: Some(r64(1.0)),
        }
        .build()
        .unwrap()
    }

    #[test]
    fn canvas_keeps_original_size() {
        let op = operator();
        let image = Tensor::rand(&[2, 3, 24, 18], tch::kind::FLOAT_CPU);
        let mask = Tensor::rand(&[2, 1, 24, 18], tch::kind::FLOAT_CPU)
            .ge(0.5)
            .to_kind(Kind::Float);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..16 {
            let (new_image, new_mask) = op.forward(&image, &mask, &mut rng).unwrap();
            assert_eq!(new_image.size(), &[2, 3, 24, 18]);
            assert_eq!(new_mask.size(), &[2, 1, 24, 18]);
        }
    }

    #[test]
    fn rank3_inputs_keep_rank() {
        let op = operator();
        let image = Tensor::rand(&[3, 16, 16], tch::kind::FLOAT_CPU);
        let mask = Tensor::ones(&[1, 16, 16], tch::kind::FLOAT_CPU);
        let mut rng = StdRng::seed_from_u64(4);
        let (new_image, new_mask) = op.forward(&image, &mask, &mut rng).unwrap();
        assert_eq!(new_image.size(), &[3, 16, 16]);
        assert_eq!(new_mask.size(), &[1, 16, 16]);
    }

    #[test]
    fn unit_fractions_are_a_no_op() {
        let op = operator();
        let image = Tensor::rand(&[1, 3, 12, 12], tch::kind::FLOAT_CPU);
        let mask = Tensor::rand(&[1, 1, 12, 12], tch::kind::FLOAT_CPU)
            .ge(0.5)
            .to_kind(Kind::Float);
        let mut rng = StdRng::seed_from_u64(9);
        let params = op
            .params_from_fractions(&mut rng, [1.0, 1.0, 1.0, 1.0], (12, 12))
            .unwrap();
        assert_eq!(params.crop_offset, [0, 0]);
        assert_eq!(params.pad_offset, [0, 0]);

        let (new_image, new_mask) = op.forward_with(&image, &mask, &params, &mut rng).unwrap();
        assert!(new_image.equal(&image));
        assert!(new_mask.equal(&mask));
    }

    #[test]
    fn oversized_crop_fails_validation() {
        let op = operator();
        let mut rng = StdRng::seed_from_u64(0);
        // a 1.5x resize with a full-size crop cannot fit the canvas
        let error = op
            .params_from_fractions(&mut rng, [1.5, 1.5, 1.0, 1.0], (10, 10))
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<AugError>(),
            Some(AugError::Validation(_))
        ));
    }

    #[test]
    fn mask_padding_is_zero_and_binary() {
        let op = operator();
        let image = Tensor::rand(&[1, 3, 20, 20], tch::kind::FLOAT_CPU);
        let mask = Tensor::ones(&[1, 1, 20, 20], tch::kind::FLOAT_CPU);
        let mut rng = StdRng::seed_from_u64(31);
        let params = op
            .params_from_fractions(&mut rng, [0.5, 0.5, 1.0, 1.0], (20, 20))
            .unwrap();
        let (_, new_mask) = op.forward_with(&image, &mask, &params, &mut rng).unwrap();

        // the 10x10 all-ones window survives; everything else is zero
        assert_eq!(f64::from(new_mask.sum(Kind::Float)), 100.0);
        let residue = f64::from((&new_mask * (&new_mask - 1.0)).abs().max());
        assert_eq!(residue, 0.0);
    }

    #[test]
    fn fill_color_stays_in_observed_range() {
        let op = operator();
        let image = Tensor::rand(&[1, 3, 16, 16], tch::kind::FLOAT_CPU) * 0.5 + 0.25;
        let mask = Tensor::zeros(&[1, 1, 16, 16], tch::kind::FLOAT_CPU);
        let mut rng = StdRng::seed_from_u64(12);
        let params = op
            .params_from_fractions(&mut rng, [1.0, 1.0, 0.5, 0.5], (16, 16))
            .unwrap();
        let (new_image, _) = op.forward_with(&image, &mask, &params, &mut rng).unwrap();
        let min_val = f64::from(image.min());
        let max_val = f64::from(image.max());
        assert!(f64::from(new_image.min()) >= min_val - 1e-6);
        assert!(f64::from(new_image.max()) <= max_val + 1e-6);
    }

    #[test]
    fn replay_with_same_seed_is_identical() {
        let op = operator();
        let image = Tensor::rand(&[1, 3, 16, 16], tch::kind::FLOAT_CPU);
        let mask = Tensor::rand(&[1, 2, 16, 16], tch::kind::FLOAT_CPU)
            .ge(0.5)
            .to_kind(Kind::Float);

        let mut sample_rng = StdRng::seed_from_u64(7);
        let params = op.sample(&mut sample_rng, (16, 16)).unwrap();

        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        let (image_a, mask_a) = op.forward_with(&image, &mask, &params, &mut rng_a).unwrap();
        let (image_b, mask_b) = op.forward_with(&image, &mask, &params, &mut rng_b).unwrap();
        assert!(image_a.equal(&image_b));
        assert!(mask_a.equal(&mask_b));
    }
}
