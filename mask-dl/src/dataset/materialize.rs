use super::{MaskDataset, ObjectAnnotation};
use crate::common::*;

/// Mask materializer initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaskMaterializerInit {
    /// Shuffle the annotation order before union or truncation.
    pub random_object_order: bool,
    /// Keep one channel per retained object instead of collapsing to a
    /// single union mask.
    pub multi_mask: bool,
    /// Upper bound of retained objects in multi-mask mode.
    pub max_masks: usize,
    /// Training mode draws the retained-object count at random.
    pub is_train: bool,
}

impl MaskMaterializerInit {
    pub fn build(self) -> Result<MaskMaterializer> {
        let Self {
            random_object_order,
            multi_mask,
            max_masks,
            is_train,
        } = self;
        ensure!(max_masks >= 1, "max_masks must be at least 1");

        Ok(MaskMaterializer {
            random_object_order,
            multi_mask,
            max_masks,
            is_train,
        })
    }
}

impl Default for MaskMaterializerInit {
    fn default() -> Self {
        Self {
            random_object_order: true,
            multi_mask: false,
            max_masks: 4,
            is_train: true,
        }
    }
}

/// Converts an image's annotation list into its mask tensor.
#[derive(Debug, Clone)]
pub struct MaskMaterializer {
    random_object_order: bool,
    multi_mask: bool,
    max_masks: usize,
    is_train: bool,
}

impl MaskMaterializer {
    /// Build the mask stack for one image.
    ///
    /// Returns `Ok(None)` when the image has no annotations at all; the
    /// loader turns that into a per-sample skip. An image with fewer
    /// annotations than the retained-object count is zero-padded instead.
    pub fn materialize<D, R>(
        &self,
        dataset: &D,
        annotations: &[Arc<ObjectAnnotation>],
        rng: &mut R,
    ) -> Result<Option<Tensor>>
    where
        D: MaskDataset + ?Sized,
        R: Rng,
    {
        if annotations.is_empty() {
            return Ok(None);
        }

        let mut annotations = annotations.to_vec();
        if self.random_object_order {
            annotations.shuffle(rng);
        }

        let mask = if self.multi_mask {
            let num_masks = if self.is_train {
                rng.gen_range(1..=self.max_masks)
            } else {
                self.max_masks
            };

            let decoded: Vec<Tensor> = annotations
                .iter()
                .take(num_masks)
                .map(|ann| decode_checked(dataset, ann))
                .try_collect()?;

            let mut stack = Tensor::stack(&decoded, 0);
            let shortfall = num_masks - decoded.len();
            if shortfall > 0 {
                let (_depth, height, width) = stack.size3()?;
                let padding = Tensor::zeros(
                    &[shortfall as i64, height, width],
                    (stack.kind(), stack.device()),
                );
                stack = Tensor::cat(&[stack, padding], 0);
            }
            stack
        } else {
            let mut union: Option<Tensor> = None;
            for ann in &annotations {
                let decoded = decode_checked(dataset, ann)?;
                union = Some(match union {
                    Some(accum) => accum.maximum(&decoded),
                    None => decoded,
                });
            }
            union.unwrap().unsqueeze(0)
        };

        Ok(Some(mask))
    }
}

fn decode_checked<D>(dataset: &D, annotation: &ObjectAnnotation) -> Result<Tensor>
where
    D: MaskDataset + ?Sized,
{
    let mask = dataset.decode_annotation(annotation)?;
    let expect = [annotation.height() as i64, annotation.width() as i64];
    ensure!(
        mask.size() == expect,
        "decoded mask size {:?} does not match the annotation's reference resolution {:?}",
        mask.size(),
        expect
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MemoryDataset, MemoryRecord};
    use rle_mask::Rle;

    /// A 6x6 source with one image and three rectangular objects.
    fn fixture() -> MemoryDataset {
        let image = Tensor::rand(&[3, 6, 6], tch::kind::FLOAT_CPU);
        let annotations = [
            rect_annotation(0, 0, 2, 2),
            rect_annotation(3, 3, 3, 3),
            rect_annotation(0, 4, 2, 2),
        ]
        .into_iter()
        .map(Arc::new)
        .collect();
        MemoryDataset::new(vec![MemoryRecord { image, annotations }]).unwrap()
    }

    fn rect_annotation(top: usize, left: usize, height: usize, width: usize) -> ObjectAnnotation {
        let mut buffer = [0u8; 36];
        for row in top..(top + height) {
            for col in left..(left + width) {
                buffer[row * 6 + col] = 1;
            }
        }
        ObjectAnnotation {
            region: Rle::from_mask(&buffer, 6, 6).unwrap(),
        }
    }

    #[test]
    fn no_annotations_yield_skip() {
        let image = Tensor::rand(&[3, 6, 6], tch::kind::FLOAT_CPU);
        let dataset = MemoryDataset::new(vec![MemoryRecord {
            image,
            annotations: vec![],
        }])
        .unwrap();
        let materializer = MaskMaterializerInit::default().build().unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let mask = materializer
            .materialize(&dataset, &dataset.load_annotations(0).unwrap(), &mut rng)
            .unwrap();
        assert!(mask.is_none());
    }

    #[test]
    fn union_is_order_independent() {
        let dataset = fixture();
        let annotations = dataset.load_annotations(0).unwrap();
        let materializer = MaskMaterializerInit {
            random_object_order: true,
            multi_mask: false,
            max_masks: 4,
            is_train: true,
        }
        .build()
        .unwrap();

        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(2);
        let mask_a = materializer
            .materialize(&dataset, &annotations, &mut rng_a)
            .unwrap()
            .unwrap();
        let mask_b = materializer
            .materialize(&dataset, &annotations, &mut rng_b)
            .unwrap()
            .unwrap();
        assert!(mask_a.equal(&mask_b));

        // the union also matches the unshuffled order
        let ordered = MaskMaterializerInit {
            random_object_order: false,
            ..MaskMaterializerInit::default()
        }
        .build()
        .unwrap();
        let mask_c = ordered
            .materialize(&dataset, &annotations, &mut rng_a)
            .unwrap()
            .unwrap();
        assert!(mask_a.equal(&mask_c));

        // three disjoint rectangles of 4 + 9 + 4 pixels
        assert_eq!(mask_a.size(), &[1, 6, 6]);
        assert_eq!(f64::from(mask_a.sum(Kind::Float)), 17.0);
    }

    #[test]
    fn eval_mode_pads_to_max_masks() {
        let dataset = fixture();
        // keep only the first two annotations
        let annotations = dataset.load_annotations(0).unwrap()[..2].to_vec();
        let materializer = MaskMaterializerInit {
            random_object_order: false,
            multi_mask: true,
            max_masks: 3,
            is_train: false,
        }
        .build()
        .unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let mask = materializer
            .materialize(&dataset, &annotations, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(mask.size(), &[3, 6, 6]);

        let first = dataset.decode_annotation(&annotations[0]).unwrap();
        let second = dataset.decode_annotation(&annotations[1]).unwrap();
        assert!(mask.i((0, .., ..)).equal(&first));
        assert!(mask.i((1, .., ..)).equal(&second));
        assert_eq!(f64::from(mask.i((2, .., ..)).sum(Kind::Float)), 0.0);
    }

    #[test]
    fn training_mode_truncates_to_sampled_count() {
        let dataset = fixture();
        let annotations = dataset.load_annotations(0).unwrap();
        let materializer = MaskMaterializerInit {
            random_object_order: false,
            multi_mask: true,
            max_masks: 2,
            is_train: true,
        }
        .build()
        .unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..16 {
            let mask = materializer
                .materialize(&dataset, &annotations, &mut rng)
                .unwrap()
                .unwrap();
            let depth = mask.size3().unwrap().0;
            assert!((1..=2).contains(&depth));
        }
    }

    #[test]
    fn zero_max_masks_is_rejected() {
        let result = MaskMaterializerInit {
            random_object_order: false,
            multi_mask: true,
            max_masks: 0,
            is_train: true,
        }
        .build();
        assert!(result.is_err());
    }
}
