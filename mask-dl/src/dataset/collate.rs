use super::{MaskBatch, MaskRecord};
use crate::common::*;

/// Collate per-sample records into one batch.
///
/// Skipped samples (`None`) are dropped. Surviving mask stacks are
/// equalized to the deepest stack in the batch by appending zero channels,
/// then stacked along a new batch dimension. A batch in which every
/// sample was skipped degrades to zero-element tensors instead of failing.
pub fn collate(records: impl IntoIterator<Item = Option<MaskRecord>>) -> Result<MaskBatch> {
    tch::no_grad(|| {
        let records: Vec<_> = records.into_iter().flatten().collect();
        if records.is_empty() {
            return Ok(MaskBatch {
                images: Tensor::zeros(&[0], (Kind::Float, Device::Cpu)),
                masks: Tensor::zeros(&[0], (Kind::Float, Device::Cpu)),
            });
        }

        let (images, masks) = records
            .into_iter()
            .map(|MaskRecord { image, mask }| (image, mask))
            .unzip_n_vec();

        let depths: Vec<i64> = masks
            .iter()
            .map(|mask| -> Result<i64> { Ok(mask.size3()?.0) })
            .try_collect()?;
        let max_masks = depths.iter().copied().max().unwrap();

        let images = Tensor::stack(&images, 0);
        let masks = if max_masks == 1 {
            Tensor::stack(&masks, 0)
        } else {
            let padded: Vec<Tensor> = masks
                .into_iter()
                .map(|mask| -> Result<Tensor> {
                    let (depth, height, width) = mask.size3()?;
                    let shortfall = max_masks - depth;
                    let mask = if shortfall > 0 {
                        let padding =
                            Tensor::zeros(&[shortfall, height, width], (mask.kind(), mask.device()));
                        Tensor::cat(&[mask, padding], 0)
                    } else {
                        mask
                    };
                    Ok(mask)
                })
                .try_collect()?;
            Tensor::stack(&padded, 0)
        };

        Ok(MaskBatch { images, masks })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(depth: i64, value: f64) -> MaskRecord {
        MaskRecord {
            image: Tensor::rand(&[3, 4, 4], tch::kind::FLOAT_CPU),
            mask: Tensor::ones(&[depth, 4, 4], tch::kind::FLOAT_CPU) * value,
        }
    }

    #[test]
    fn pads_to_batch_maximum() {
        let records = vec![Some(record(1, 1.0)), Some(record(3, 1.0)), Some(record(2, 1.0))];
        let batch = collate(records).unwrap();
        assert_eq!(batch.images.size(), &[3, 3, 4, 4]);
        assert_eq!(batch.masks.size(), &[3, 3, 4, 4]);

        // padded channels are exactly zero
        assert_eq!(
            f64::from(batch.masks.i((0, 1.., .., ..)).abs().sum(Kind::Float)),
            0.0
        );
        assert_eq!(
            f64::from(batch.masks.i((2, 2.., .., ..)).abs().sum(Kind::Float)),
            0.0
        );
        // the deepest sample is unchanged
        assert_eq!(
            f64::from(batch.masks.i((1, .., .., ..)).sum(Kind::Float)),
            48.0
        );
    }

    #[test]
    fn single_channel_stacks_directly() {
        let records = vec![Some(record(1, 1.0)), Some(record(1, 0.0))];
        let batch = collate(records).unwrap();
        assert_eq!(batch.masks.size(), &[2, 1, 4, 4]);
        assert_eq!(batch.batch_size(), 2);
    }

    #[test]
    fn skips_are_dropped() {
        let records = vec![None, Some(record(2, 1.0)), None];
        let batch = collate(records).unwrap();
        assert_eq!(batch.images.size(), &[1, 3, 4, 4]);
        assert_eq!(batch.masks.size(), &[1, 2, 4, 4]);
    }

    #[test]
    fn all_skips_degrade_to_empty_batch() {
        let batch = collate(vec![None, None]).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.batch_size(), 0);
        assert_eq!(batch.images.size(), &[0]);
        assert_eq!(batch.masks.size(), &[0]);
    }
}
