use super::ObjectAnnotation;
use crate::common::*;

/// The annotation-backed image source.
///
/// Implementations provide pixel data, per-image object annotations, and
/// the decoding of one annotation into a dense binary mask. Everything
/// else in the pipeline is written against this boundary.
pub trait MaskDataset
where
    Self: Debug + Send,
{
    /// Get the number of images in the dataset.
    fn num_records(&self) -> usize;

    /// The number of color channels of the dataset.
    fn input_channels(&self) -> usize;

    /// Load the pixels of the nth image as a `[C, H, W]` float tensor.
    fn load_image(&self, index: usize) -> Pin<Box<dyn Future<Output = Result<Tensor>> + Send>>;

    /// List the object annotations of the nth image.
    fn load_annotations(&self, index: usize) -> Result<Vec<Arc<ObjectAnnotation>>>;

    /// Decode one annotation into a `[H, W]` float mask with values in
    /// `{0, 1}` at the image's reference resolution.
    fn decode_annotation(&self, annotation: &ObjectAnnotation) -> Result<Tensor>;
}
