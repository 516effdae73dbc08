use super::ensure_pair;
use crate::{
    common::*,
    utils::{Interpolation, TensorExt as _},
};

/// Rotation operator initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomRotateInit {
    pub min_degrees: Option<i64>,
    pub max_degrees: Option<i64>,
}

impl RandomRotateInit {
    pub fn build(self) -> Result<RandomRotate> {
        let Self {
            min_degrees,
            max_degrees,
        } = self;

        if let (Some(min), Some(max)) = (min_degrees, max_degrees) {
            ensure!(min <= max, "min_degrees must not exceed max_degrees");
        }

        Ok(RandomRotate {
            min_degrees,
            max_degrees,
        })
    }
}

impl Default for RandomRotateInit {
    fn default() -> Self {
        Self {
            min_degrees: Some(-10),
            max_degrees: Some(10),
        }
    }
}

/// Rotates an image and its mask by one shared random angle about the
/// image center. Uncovered pixels are zero filled.
#[derive(Debug, Clone)]
pub struct RandomRotate {
    min_degrees: Option<i64>,
    max_degrees: Option<i64>,
}

/// Parameters of one rotation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RotateParams {
    /// Positive angles rotate counter-clockwise.
    pub degrees: i64,
}

impl RandomRotate {
    pub fn sample(&self, rng: &mut impl Rng) -> Result<RotateParams> {
        let (min, max) = match (self.min_degrees, self.max_degrees) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(AugError::configuration(
                    "min_degrees and max_degrees must be provided",
                )
                .into())
            }
        };
        Ok(RotateParams {
            degrees: rng.gen_range(min..=max),
        })
    }

    pub fn forward(
        &self,
        image: &Tensor,
        mask: &Tensor,
        rng: &mut impl Rng,
    ) -> Result<(Tensor, Tensor)> {
        let params = self.sample(rng)?;
        self.forward_with(image, mask, &params)
    }

    pub fn forward_with(
        &self,
        image: &Tensor,
        mask: &Tensor,
        params: &RotateParams,
    ) -> Result<(Tensor, Tensor)> {
        let (height, width) = ensure_pair(image, mask)?;
        let matrix = rotation_matrix(params.degrees, height, width);
        let new_image = image.f_warp2d(&matrix, Interpolation::Bilinear)?;
        let new_mask = mask.f_warp2d(&matrix, Interpolation::Nearest)?;
        Ok((new_image, new_mask))
    }
}

// Inverse map of a rotation about the central pixel: for every output
// pixel, the source location it samples from.
fn rotation_matrix(degrees: i64, height: i64, width: i64) -> [[f64; 3]; 3] {
    let radians = (degrees as f64).to_radians();
    let (sin, cos) = radians.sin_cos();
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;
    [
        [cos, -sin, cx - cos * cx + sin * cy],
        [sin, cos, cy - sin * cx - cos * cy],
        [0.0, 0.0, 1.0],
    ]
}
