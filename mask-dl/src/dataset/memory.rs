use super::{MaskDataset, ObjectAnnotation};
use crate::common::*;

/// One in-memory sample: image pixels plus the image's annotation list.
#[derive(Debug)]
pub struct MemoryRecord {
    /// `[C, H, W]` float image.
    pub image: Tensor,
    pub annotations: Vec<Arc<ObjectAnnotation>>,
}

/// An annotation-backed dataset held entirely in memory.
#[derive(Debug)]
pub struct MemoryDataset {
    records: Vec<Arc<MemoryRecord>>,
    input_channels: usize,
}

impl MemoryDataset {
    pub fn new(records: Vec<MemoryRecord>) -> Result<Self> {
        let input_channels = match records.first() {
            Some(record) => record.image.size3()?.0 as usize,
            None => 3,
        };
        for (index, record) in records.iter().enumerate() {
            let (channels, _height, _width) = record
                .image
                .size3()
                .with_context(|| format!("record {} image must have shape [C, H, W]", index))?;
            ensure!(
                channels as usize == input_channels,
                "record {} has {} channels, but the dataset has {}",
                index,
                channels,
                input_channels
            );
        }

        Ok(Self {
            records: records.into_iter().map(Arc::new).collect(),
            input_channels,
        })
    }
}

impl MaskDataset for MemoryDataset {
    fn num_records(&self) -> usize {
        self.records.len()
    }

    fn input_channels(&self) -> usize {
        self.input_channels
    }

    fn load_image(&self, index: usize) -> Pin<Box<dyn Future<Output = Result<Tensor>> + Send>> {
        let record = self.records.get(index).cloned();
        Box::pin(async move {
            let record = record.ok_or_else(|| format_err!("invalid index {}", index))?;
            Ok(record.image.shallow_clone())
        })
    }

    fn load_annotations(&self, index: usize) -> Result<Vec<Arc<ObjectAnnotation>>> {
        let record = self
            .records
            .get(index)
            .ok_or_else(|| format_err!("invalid index {}", index))?;
        Ok(record.annotations.clone())
    }

    fn decode_annotation(&self, annotation: &ObjectAnnotation) -> Result<Tensor> {
        let region = &annotation.region;
        let buffer = region.decode();
        Ok(Tensor::of_slice(&buffer).view([region.height() as i64, region.width() as i64]))
    }
}
