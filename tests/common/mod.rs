//! Common test utilities for integration tests
//! Provides synthetic images and masks plus a generator that counts draws

#![allow(dead_code)]

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::BTreeSet;

use seg_augment::AugmentConfig;

/// Route the crate's `tracing` output to the test harness.
///
/// Set `RUST_LOG=seg_augment=debug` to see per-step decisions.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Synthetic image / mask pair
#[derive(Clone, Debug)]
pub struct TestSample {
    /// `(H, W, 3)` BGR
    pub image: Array3<u8>,
    /// `(H, W, 1)` class ids
    pub mask: Array3<u8>,
}

/// Uniform image whose mask has a square block of `inner` in the top-left
/// corner and `outer` everywhere else.
pub fn generate_block_sample(
    height: usize,
    width: usize,
    block: usize,
    color: u8,
    inner: u8,
    outer: u8,
) -> TestSample {
    TestSample {
        image: Array3::from_elem((height, width, 3), color),
        mask: Array3::from_shape_fn((height, width, 1), |(y, x, _)| {
            if y < block && x < block {
                inner
            } else {
                outer
            }
        }),
    }
}

/// Image with a distinct gradient per channel and a mask striped by column.
pub fn generate_gradient_sample(height: usize, width: usize, classes: u8) -> TestSample {
    TestSample {
        image: Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            ((y * 7 + x * 13 + c * 50) % 256) as u8
        }),
        mask: Array3::from_shape_fn((height, width, 1), |(_, x, _)| (x % classes as usize) as u8),
    }
}

/// Config for a `height` x `width` output with every random step disabled.
pub fn plain_config(height: usize, width: usize) -> AugmentConfig {
    let mut config = AugmentConfig::new([3, height, width]);
    config.max_aspect_ratio = 0.0;
    config.min_aspect_ratio = 0.0;
    config.rand_mirror_prob = 0.0;
    config
}

/// Distinct values present in `mask`
pub fn label_set(mask: &ndarray::ArrayView3<'_, u8>) -> BTreeSet<u8> {
    mask.iter().copied().collect()
}

/// Seeded generator that counts how many primitive draws were made
pub struct CountingRng {
    inner: StdRng,
    pub draws: usize,
}

impl CountingRng {
    pub fn new(seed: u64) -> Self {
        CountingRng {
            inner: StdRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        self.draws += 1;
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws += 1;
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws += 1;
        self.inner.try_fill_bytes(dest)
    }
}
