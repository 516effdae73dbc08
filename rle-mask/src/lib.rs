//! Run-length encoded binary region masks.
//!
//! Runs are stored in column-major scan order and alternate background /
//! foreground, starting with background. The sum of run lengths must equal
//! `height * width`.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// A run-length encoded binary mask.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rle {
    height: usize,
    width: usize,
    counts: Vec<u32>,
}

impl Rle {
    /// Build an RLE mask from raw run lengths.
    pub fn new(height: usize, width: usize, counts: Vec<u32>) -> Result<Self> {
        let total: usize = counts.iter().map(|&count| count as usize).sum();
        ensure!(
            total == height * width,
            "run lengths sum to {}, but the mask has {} pixels ({}x{})",
            total,
            height * width,
            height,
            width
        );
        Ok(Self {
            height,
            width,
            counts,
        })
    }

    /// Encode a dense row-major mask. Nonzero bytes are foreground.
    pub fn from_mask(mask: &[u8], height: usize, width: usize) -> Result<Self> {
        ensure!(
            mask.len() == height * width,
            "mask length {} does not match {}x{}",
            mask.len(),
            height,
            width
        );

        let mut counts = vec![];
        let mut prev = 0u8;
        let mut run = 0u32;

        // scan in column-major order
        for col in 0..width {
            for row in 0..height {
                let value = u8::from(mask[row * width + col] != 0);
                if value != prev {
                    counts.push(run);
                    run = 0;
                    prev = value;
                }
                run += 1;
            }
        }
        counts.push(run);

        Self::new(height, width, counts)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Decode into a dense row-major `{0.0, 1.0}` buffer of `height * width`
    /// elements.
    pub fn decode(&self) -> Vec<f32> {
        let Self { height, width, .. } = *self;
        let mut mask = vec![0.0f32; height * width];

        let mut offset = 0usize;
        let mut value = 0.0f32;
        for &count in &self.counts {
            if value != 0.0 {
                for index in offset..(offset + count as usize) {
                    // runs advance down columns first
                    let row = index % height;
                    let col = index / height;
                    mask[row * width + col] = value;
                }
            }
            offset += count as usize;
            value = 1.0 - value;
        }

        mask
    }

    /// Number of foreground pixels. Odd-indexed runs are foreground.
    pub fn area(&self) -> usize {
        self.counts
            .iter()
            .skip(1)
            .step_by(2)
            .map(|&count| count as usize)
            .sum()
    }
}
