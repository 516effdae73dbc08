use crate::common::*;
use rle_mask::Rle;

/// One object annotation: a run-length encoded region at the image's
/// reference resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAnnotation {
    pub region: Rle,
}

impl ObjectAnnotation {
    /// Reference height of the annotated image.
    pub fn height(&self) -> usize {
        self.region.height()
    }

    /// Reference width of the annotated image.
    pub fn width(&self) -> usize {
        self.region.width()
    }
}

/// The record with image pixels and the materialized mask stack.
#[derive(Debug, TensorLike)]
pub struct MaskRecord {
    /// `[C, H, W]` image.
    pub image: Tensor,
    /// `[K, H, W]` mask stack, one channel per retained object.
    pub mask: Tensor,
}

/// A collated batch.
#[derive(Debug, TensorLike)]
pub struct MaskBatch {
    /// `[B, C, H, W]` images, or a 1-D zero-element tensor when every
    /// sample of the batch was skipped.
    pub images: Tensor,
    /// `[B, K, H, W]` masks with `K` equalized across the batch, or a 1-D
    /// zero-element tensor when every sample was skipped.
    pub masks: Tensor,
}

impl MaskBatch {
    pub fn is_empty(&self) -> bool {
        self.images.numel() == 0
    }

    pub fn batch_size(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.images.size()[0]
        }
    }
}
