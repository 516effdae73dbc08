use super::ensure_pair;
use crate::{
    common::*,
    utils::{Interpolation, TensorExt as _},
};

/// Perspective operator initializer. The distortion scale bounds the
/// corner displacements relative to the image half-extent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomPerspectiveInit {
    pub min_distortion: Option<R64>,
    pub max_distortion: Option<R64>,
}

impl RandomPerspectiveInit {
    pub fn build(self) -> Result<RandomPerspective> {
        let Self {
            min_distortion,
            max_distortion,
        } = self;

        for (name, bound) in [
            ("min_distortion", min_distortion),
            ("max_distortion", max_distortion),
        ] {
            if let Some(bound) = bound {
                ensure!(
                    (0.0..=1.0).contains(&bound.raw()),
                    "{} must be between 0.0 and 1.0",
                    name
                );
            }
        }
        if let (Some(min), Some(max)) = (min_distortion, max_distortion) {
            ensure!(min <= max, "min_distortion must not exceed max_distortion");
        }

        Ok(RandomPerspective {
            min_distortion: min_distortion.map(R64::raw),
            max_distortion: max_distortion.map(R64::raw),
        })
    }
}

impl Default for RandomPerspectiveInit {
    fn default() -> Self {
        Self {
            min_distortion: Some(r64(0.1)),
            max_distortion: Some(r64(0.5)),
        }
    }
}

/// Applies one shared projective warp to an image and its mask, pulling
/// the four corners inward by randomly sampled displacements.
#[derive(Debug, Clone)]
pub struct RandomPerspective {
    min_distortion: Option<f64>,
    max_distortion: Option<f64>,
}

/// Corner correspondences of one perspective call, as `[x, y]` pixel
/// coordinates. The content at `startpoints[i]` is mapped to
/// `endpoints[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerspectiveParams {
    pub startpoints: [[i64; 2]; 4],
    pub endpoints: [[i64; 2]; 4],
}

impl RandomPerspective {
    pub fn sample(
        &self,
        rng: &mut impl Rng,
        (height, width): (i64, i64),
    ) -> Result<PerspectiveParams> {
        let (min, max) = match (self.min_distortion, self.max_distortion) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(AugError::configuration(
                    "min_distortion and max_distortion must be provided",
                )
                .into())
            }
        };
        let distortion = rng.gen_range(min..=max);

        let shift_x = (distortion * (width / 2) as f64) as i64;
        let shift_y = (distortion * (height / 2) as f64) as i64;

        let topleft = [rng.gen_range(0..=shift_x), rng.gen_range(0..=shift_y)];
        let topright = [
            rng.gen_range((width - shift_x - 1)..width),
            rng.gen_range(0..=shift_y),
        ];
        let botright = [
            rng.gen_range((width - shift_x - 1)..width),
            rng.gen_range((height - shift_y - 1)..height),
        ];
        let botleft = [
            rng.gen_range(0..=shift_x),
            rng.gen_range((height - shift_y - 1)..height),
        ];

        Ok(PerspectiveParams {
            startpoints: [
                [0, 0],
                [width - 1, 0],
                [width - 1, height - 1],
                [0, height - 1],
            ],
            endpoints: [topleft, topright, botright, botleft],
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
        params: &PerspectiveParams,
    ) -> Result<(Tensor, Tensor)> {
        ensure_pair(image, mask)?;
        // sample each output endpoint from its source startpoint
        let matrix = homography(&params.endpoints, &params.startpoints)?;
        let new_image = image.f_warp2d(&matrix, Interpolation::Bilinear)?;
        let new_mask = mask.f_warp2d(&matrix, Interpolation::Nearest)?;
        Ok((new_image, new_mask))
    }
}

/// Solve the projective transform mapping every `from[i]` to `to[i]`.
fn homography(from: &[[i64; 2]; 4], to: &[[i64; 2]; 4]) -> Result<[[f64; 3]; 3]> {
    let mut rows = Vec::with_capacity(64);
    let mut rhs = Vec::with_capacity(8);
    for (&[x, y], &[u, v]) in from.iter().zip(to.iter()) {
        let (x, y, u, v) = (x as f64, y as f64, u as f64, v as f64);
        rows.extend_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]);
        rows.extend_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y]);
        rhs.push(u);
        rhs.push(v);
    }

    let lhs = Tensor::of_slice(&rows).view([8, 8]);
    let rhs = Tensor::of_slice(&rhs).view([8, 1]);
    let solution = lhs
        .f_linalg_solve(&rhs)
        .with_context(|| "degenerate corner correspondences")?;
    let coefs: Vec<f64> = solution.view([8]).into();

    Ok([
        [coefs[0], coefs[1], coefs[2]],
        [coefs[3], coefs[4], coefs[5]],
        [coefs[6], coefs[7], 1.0],
    ])
}
