use crate::common::*;

/// Resampling policy applied when pixels are interpolated.
///
/// Masks must use [`Interpolation::Nearest`] so that discrete label values
/// survive resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Bilinear,
    Nearest,
}

impl Interpolation {
    fn grid_sampler_mode(&self) -> i64 {
        match self {
            Self::Bilinear => 0,
            Self::Nearest => 1,
        }
    }
}

pub trait TensorExt {
    /// Get the spatial `(height, width)` of a 3 or 4 dimensional tensor.
    fn f_spatial_size(&self) -> Result<(i64, i64)>;

    /// Resize the spatial dimensions to exactly `new_height` x `new_width`.
    fn f_resize2d(
        &self,
        new_height: i64,
        new_width: i64,
        interpolation: Interpolation,
    ) -> Result<Tensor>;

    /// Extract the window at `(top, left)` of size `height` x `width`.
    fn f_crop2d(&self, top: i64, left: i64, height: i64, width: i64) -> Result<Tensor>;

    /// Mirror along the width axis.
    fn f_hflip(&self) -> Result<Tensor>;

    /// Resample through the projective transform `matrix`, which maps output
    /// pixel coordinates `(x, y, 1)` to source pixel coordinates. Out of
    /// bound samples are filled with zero.
    fn f_warp2d(&self, matrix: &[[f64; 3]; 3], interpolation: Interpolation) -> Result<Tensor>;
}

impl TensorExt for Tensor {
    fn f_spatial_size(&self) -> Result<(i64, i64)> {
        match *self.size().as_slice() {
            [_c, height, width] | [_b, _c, height, width] => Ok((height, width)),
            ref shape => bail!(
                "expect a 3 or 4 dimensional tensor, but get shape {:?}",
                shape
            ),
        }
    }

    fn f_resize2d(
        &self,
        new_height: i64,
        new_width: i64,
        interpolation: Interpolation,
    ) -> Result<Tensor> {
        ensure!(
            new_height > 0 && new_width > 0,
            "resize target must be positive, but get {}x{}",
            new_height,
            new_width
        );

        tch::no_grad(|| {
            let (input, batched) = to_batched(self)?;
            let resized = match interpolation {
                Interpolation::Bilinear => {
                    input.upsample_bilinear2d(&[new_height, new_width], false, None, None)
                }
                Interpolation::Nearest => {
                    input.upsample_nearest2d(&[new_height, new_width], None, None)
                }
            };
            from_batched(resized, batched)
        })
    }

    fn f_crop2d(&self, top: i64, left: i64, height: i64, width: i64) -> Result<Tensor> {
        ensure!(
            height > 0 && width > 0,
            "crop size must be positive, but get {}x{}",
            height,
            width
        );
        let (input_h, input_w) = self.f_spatial_size()?;
        ensure!(
            top >= 0 && left >= 0 && top + height <= input_h && left + width <= input_w,
            "crop window ({}, {}) {}x{} exceeds input size {}x{}",
            top,
            left,
            height,
            width,
            input_h,
            input_w
        );

        let cropped = match self.dim() {
            3 => self.i((.., top..(top + height), left..(left + width))),
            4 => self.i((.., .., top..(top + height), left..(left + width))),
            _ => unreachable!(),
        };
        Ok(cropped)
    }

    fn f_hflip(&self) -> Result<Tensor> {
        match self.dim() {
            3 | 4 => Ok(self.flip(&[-1])),
            dim => bail!("expect a 3 or 4 dimensional tensor, but get {} dims", dim),
        }
    }

    fn f_warp2d(&self, matrix: &[[f64; 3]; 3], interpolation: Interpolation) -> Result<Tensor> {
        tch::no_grad(|| {
            let (input, batched) = to_batched(self)?;
            let (bsize, _channels, height, width) = input.size4()?;
            let options = (input.kind(), input.device());

            let xs = Tensor::arange(width, options).view([1, width]);
            let ys = Tensor::arange(height, options).view([height, 1]);

            let [[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]] = *matrix;
            let denom = &xs * m20 + &ys * m21 + m22;
            let src_x = (&xs * m00 + &ys * m01 + m02) / &denom;
            let src_y = (&xs * m10 + &ys * m11 + m12) / &denom;

            // normalize pixel coordinates into the [-1, 1] sampling space
            let grid_x = (src_x * 2.0 + 1.0) / (width as f64) - 1.0;
            let grid_y = (src_y * 2.0 + 1.0) / (height as f64) - 1.0;
            let grid = Tensor::stack(&[grid_x, grid_y], 2)
                .view([1, height, width, 2])
                .expand(&[bsize, height, width, 2], false);

            let warped = input.grid_sampler(&grid, interpolation.grid_sampler_mode(), 0, false);
            from_batched(warped, batched)
        })
    }
}

fn to_batched(tensor: &Tensor) -> Result<(Tensor, bool)> {
    match tensor.dim() {
        3 => Ok((tensor.unsqueeze(0), false)),
        4 => Ok((tensor.shallow_clone(), true)),
        dim => bail!("expect a 3 or 4 dimensional tensor, but get {} dims", dim),
    }
}

fn from_batched(tensor: Tensor, batched: bool) -> Result<Tensor> {
    if batched {
        Ok(tensor)
    } else {
        let (_b, channels, height, width) = tensor.size4()?;
        Ok(tensor.reshape(&[channels, height, width]))
    }
}

/// The identity projective transform.
pub fn identity_matrix() -> [[f64; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}
