use super::ensure_pair;
use crate::{common::*, utils::TensorExt as _};

/// Mirrors an image and its mask along the width axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HorizontalFlip;

impl HorizontalFlip {
    pub fn forward(&self, image: &Tensor, mask: &Tensor) -> Result<(Tensor, Tensor)> {
        ensure_pair(image, mask)?;
        Ok((image.f_hflip()?, mask.f_hflip()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_mirrors_both() {
        let image = Tensor::arange(8, tch::kind::FLOAT_CPU).view([1, 2, 4]);
        let mask = Tensor::of_slice(&[0.0f32, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]).view([1, 2, 4]);
        let (new_image, new_mask) = HorizontalFlip.forward(&image, &mask).unwrap();

        let expected_image =
            Tensor::of_slice(&[3.0f32, 2.0, 1.0, 0.0, 7.0, 6.0, 5.0, 4.0]).view([1, 2, 4]);
        let expected_mask =
            Tensor::of_slice(&[0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0]).view([1, 2, 4]);
        assert!(new_image.equal(&expected_image));
        assert!(new_mask.equal(&expected_mask));
    }

    #[test]
    fn rejects_mismatched_sizes() {
        let image = Tensor::zeros(&[3, 4, 4], tch::kind::FLOAT_CPU);
        let mask = Tensor::zeros(&[1, 4, 5], tch::kind::FLOAT_CPU);
        assert!(HorizontalFlip.forward(&image, &mask).is_err());
    }
}
