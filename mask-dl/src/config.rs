//! Loader configuration format.

use crate::{common::*, dataset::MaskMaterializerInit};

/// The data loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Side length of the square images produced by the pre-transform.
    pub image_size: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    /// Shuffle the sample order every epoch.
    #[serde(default = "default_true")]
    pub shuffle: bool,
    /// Worker parallelism. Defaults to the number of CPU cores.
    pub num_workers: Option<NonZeroUsize>,
    /// Drop the final batch when it holds fewer than `batch_size` samples.
    #[serde(default)]
    pub drop_last: bool,
    /// Optional per-channel image normalization.
    pub normalize: Option<NormalizeConfig>,
    /// Mask materialization options.
    #[serde(default)]
    pub mask: MaskConfig,
}

impl LoaderConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

/// Per-channel normalization statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    pub mean: Vec<R64>,
    pub std: Vec<R64>,
}

impl NormalizeConfig {
    /// Validate against a channel count and build broadcastable tensors.
    pub fn to_stats(&self, channels: usize) -> Result<Normalize> {
        ensure!(
            self.mean.len() == channels && self.std.len() == channels,
            "normalization statistics must have {} entries, but get {} means and {} stds",
            channels,
            self.mean.len(),
            self.std.len()
        );
        ensure!(
            self.std.iter().all(|&std| std != 0.0),
            "normalization std must be nonzero"
        );

        let mean: Vec<f64> = self.mean.iter().map(|value| value.raw()).collect();
        let std: Vec<f64> = self.std.iter().map(|value| value.raw()).collect();
        Ok(Normalize {
            mean: Tensor::of_slice(&mean)
                .view([channels as i64, 1, 1])
                .to_kind(Kind::Float),
            std: Tensor::of_slice(&std)
                .view([channels as i64, 1, 1])
                .to_kind(Kind::Float),
        })
    }
}

/// Broadcastable per-channel normalization.
#[derive(Debug)]
pub struct Normalize {
    mean: Tensor,
    std: Tensor,
}

impl Normalize {
    pub fn forward(&self, image: &Tensor) -> Tensor {
        (image - &self.mean) / &self.std
    }
}

/// Mask materialization options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Shuffle annotation order before union or truncation.
    #[serde(default = "default_true")]
    pub random_object_order: bool,
    /// Keep per-object channels instead of a single union mask.
    #[serde(default)]
    pub multi_mask: bool,
    /// Upper bound of retained objects in multi-mask mode.
    #[serde(default = "default_max_masks")]
    pub max_masks: NonZeroUsize,
    /// Training mode randomizes the retained-object count.
    #[serde(default = "default_true")]
    pub is_train: bool,
}

impl MaskConfig {
    pub fn materializer_init(&self) -> MaskMaterializerInit {
        MaskMaterializerInit {
            random_object_order: self.random_object_order,
            multi_mask: self.multi_mask,
            max_masks: self.max_masks.get(),
            is_train: self.is_train,
        }
    }
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            random_object_order: true,
            multi_mask: false,
            max_masks: default_max_masks(),
            is_train: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_masks() -> NonZeroUsize {
    NonZeroUsize::new(4).unwrap()
}
