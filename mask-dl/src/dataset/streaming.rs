use super::{collate, MaskBatch, MaskDataset, MaskMaterializer, MaskRecord};
use crate::{
    common::*,
    config::{LoaderConfig, Normalize},
    processor::ResizeCenterCrop,
};

/// Batched mask-loading stream.
///
/// Wires an annotation-backed dataset, the mask materializer, the
/// fixed-size pre-transform, and the collator into a stream of batches.
/// Samples without annotations are skipped, never retried.
#[derive(Debug)]
pub struct MaskStream<D>
where
    D: 'static + MaskDataset + Sync,
{
    dataset: Arc<D>,
    config: LoaderConfig,
    materializer: MaskMaterializer,
    fit: ResizeCenterCrop,
    normalize: Option<Arc<Normalize>>,
}

impl<D> MaskStream<D>
where
    D: 'static + MaskDataset + Sync,
{
    pub fn new(dataset: D, config: LoaderConfig) -> Result<Self> {
        let materializer = config.mask.materializer_init().build()?;
        let fit = ResizeCenterCrop::new(config.image_size.get())?;
        let normalize = config
            .normalize
            .as_ref()
            .map(|stats| -> Result<_> { Ok(Arc::new(stats.to_stats(dataset.input_channels())?)) })
            .transpose()?;

        Ok(Self {
            dataset: Arc::new(dataset),
            config,
            materializer,
            fit,
            normalize,
        })
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Build a single-epoch stream of collated batches.
    pub fn stream(&self) -> Result<Pin<Box<dyn Stream<Item = Result<MaskBatch>> + Send>>> {
        let num_records = self.dataset.num_records();
        let batch_size = self.config.batch_size.get();
        let num_workers = self
            .config
            .num_workers
            .map(NonZeroUsize::get)
            .unwrap_or_else(num_cpus::get);
        let drop_last = self.config.drop_last;

        // per-epoch sample order
        let mut indexes: Vec<usize> = (0..num_records).collect();
        if self.config.shuffle {
            indexes.shuffle(&mut StdRng::from_entropy());
        }

        // load and materialize samples in parallel workers
        let stream = {
            let dataset = self.dataset.clone();
            let materializer = self.materializer.clone();
            let normalize = self.normalize.clone();
            let fit = self.fit;

            stream::iter(indexes)
                .enumerate()
                .map(Ok)
                .try_par_then_unordered(num_workers, move |(order, index)| {
                    let dataset = dataset.clone();
                    let materializer = materializer.clone();
                    let normalize = normalize.clone();

                    async move {
                        let annotations = dataset.load_annotations(index)?;
                        let mut rng = StdRng::from_entropy();

                        // materialize before touching pixels so empty
                        // samples skip the image load
                        let mask =
                            match materializer.materialize(&*dataset, &annotations, &mut rng)? {
                                Some(mask) => mask,
                                None => {
                                    warn!("skipping sample {} without annotations", index);
                                    return Ok((order, None));
                                }
                            };

                        let image = dataset.load_image(index).await?;
                        let (image, mask) = fit.forward(&image, &mask)?;
                        let image = match &normalize {
                            Some(stats) => stats.forward(&image),
                            None => image,
                        };

                        Ok((order, Some(MaskRecord { image, mask })))
                    }
                })
                .try_reorder_enumerated()
        };

        // group into batches and collate
        let stream = stream
            .chunks(batch_size)
            .map(move |chunk| -> Result<Option<MaskBatch>> {
                let records: Vec<Option<MaskRecord>> = chunk.into_iter().try_collect()?;
                if drop_last && records.len() < batch_size {
                    return Ok(None);
                }
                Ok(Some(collate(records)?))
            })
            .filter_map(|result| {
                future::ready(match result {
                    Ok(Some(batch)) => Some(Ok(batch)),
                    Ok(None) => None,
                    Err(err) => Some(Err(err)),
                })
            });

        Ok(Box::pin(stream))
    }
}
