//! Augmenter interface, per-worker scratch space and the name registry.

use ndarray::{Array3, ArrayView3};
use rand::RngCore;
use std::collections::BTreeMap;

use crate::config::AugmentConfig;
use crate::error::{Error, Result};
use crate::geometry::copy_into;
use crate::labels::LabelIdMap;
use crate::seg::SegAugmenter;

/// Augmented image and mask, borrowed from a [`Workspace`]
#[derive(Debug)]
pub struct SegSample<'w> {
    /// `(data_shape[1], data_shape[2], 3)` BGR image
    pub image: ArrayView3<'w, u8>,
    /// `(H, W, 1)` label mask, after label-only scaling
    pub mask: ArrayView3<'w, u8>,
}

/// Randomized per-sample augmentation.
///
/// Implementations hold only immutable configuration. Scratch memory lives in
/// the caller's [`Workspace`] and randomness comes from the caller's
/// generator, so one augmenter can be shared by many worker threads as long
/// as each worker brings its own workspace and generator.
pub trait Augmenter: Send + Sync {
    /// Registry name of this augmenter.
    fn name(&self) -> &'static str;

    /// Augment an image that has no label mask.
    fn process_image<'w>(
        &self,
        image: ArrayView3<'_, u8>,
        rng: &mut dyn RngCore,
        ws: &'w mut Workspace,
    ) -> Result<ArrayView3<'w, u8>>;

    /// Augment an image and its co-registered label mask together.
    fn process_with_mask<'w>(
        &self,
        image: ArrayView3<'_, u8>,
        mask: ArrayView3<'_, u8>,
        rng: &mut dyn RngCore,
        label_map: &LabelIdMap,
        ws: &'w mut Workspace,
    ) -> Result<SegSample<'w>>;
}

/// Reusable scratch buffers for one worker.
///
/// Each `process_*` call borrows the workspace mutably for as long as its
/// output is alive, so a workspace can never serve two calls at once.
#[derive(Debug)]
pub struct Workspace {
    pub(crate) image: [Array3<u8>; 2],
    pub(crate) mask: [Array3<u8>; 2],
}

impl Default for Workspace {
    fn default() -> Self {
        Workspace::new()
    }
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        let empty = || Array3::zeros((0, 0, 0));
        Workspace {
            image: [empty(), empty()],
            mask: [empty(), empty()],
        }
    }
}

/// Ping-pong stage chain over two scratch buffers.
///
/// The first stage reads the caller's input; every later stage reads the
/// buffer the previous one wrote and writes the other.
pub(crate) struct Stages<'a, 'w> {
    input: ArrayView3<'a, u8>,
    buffers: &'w mut [Array3<u8>; 2],
    current: Option<usize>,
}

impl<'a, 'w> Stages<'a, 'w> {
    pub(crate) fn new(input: ArrayView3<'a, u8>, buffers: &'w mut [Array3<u8>; 2]) -> Self {
        Stages {
            input,
            buffers,
            current: None,
        }
    }

    /// Output of the last stage.
    pub(crate) fn view(&self) -> ArrayView3<'_, u8> {
        match self.current {
            None => self.input.view(),
            Some(i) => self.buffers[i].view(),
        }
    }

    /// `(height, width)` of the last stage's output.
    pub(crate) fn dims(&self) -> (usize, usize) {
        let (h, w, _) = self.view().dim();
        (h, w)
    }

    /// Run one out-of-place stage.
    pub(crate) fn apply<T>(
        &mut self,
        stage: impl FnOnce(ArrayView3<'_, u8>, &mut Array3<u8>) -> T,
    ) -> T {
        let [first, second] = &mut *self.buffers;
        let (src, dst, next) = match self.current {
            None => (self.input.view(), first, 0),
            Some(0) => (first.view(), second, 1),
            Some(_) => (second.view(), first, 0),
        };
        let out = stage(src, dst);
        self.current = Some(next);
        out
    }

    /// Run one in-place stage on an owned buffer.
    pub(crate) fn modify<T>(&mut self, stage: impl FnOnce(&mut Array3<u8>) -> T) -> T {
        if self.current.is_none() {
            self.apply(copy_into);
        }
        let index = self.current.unwrap_or(0);
        stage(&mut self.buffers[index])
    }

    /// Hand out the final buffer for the workspace's lifetime.
    pub(crate) fn finish(mut self) -> ArrayView3<'w, u8> {
        if self.current.is_none() {
            self.apply(copy_into);
        }
        let index = self.current.unwrap_or(0);
        let buffers: &'w [Array3<u8>; 2] = self.buffers;
        buffers[index].view()
    }
}

/// Constructor stored in an [`AugmenterRegistry`]
pub type AugmenterCtor = fn(AugmentConfig) -> Result<Box<dyn Augmenter>>;

fn build_seg_augmenter(config: AugmentConfig) -> Result<Box<dyn Augmenter>> {
    Ok(Box::new(SegAugmenter::new(config)?))
}

/// Explicit name -> constructor table, filled in by the hosting application.
#[derive(Debug, Default, Clone)]
pub struct AugmenterRegistry {
    ctors: BTreeMap<String, AugmenterCtor>,
}

impl AugmenterRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        AugmenterRegistry::default()
    }

    /// Registry holding the built-in segmentation augmenter.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = AugmenterRegistry::new();
        registry.register(SegAugmenter::NAME, build_seg_augmenter);
        registry
    }

    /// Add or replace a constructor.
    pub fn register(&mut self, name: impl Into<String>, ctor: AugmenterCtor) {
        self.ctors.insert(name.into(), ctor);
    }

    /// Build the augmenter registered under `name`.
    pub fn create(&self, name: &str, config: AugmentConfig) -> Result<Box<dyn Augmenter>> {
        let ctor = self
            .ctors
            .get(name)
            .ok_or_else(|| Error::UnknownAugmenter(name.to_string()))?;
        ctor(config)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::flip_horizontal_into;

    #[test]
    fn test_stages_alternate_buffers() {
        let input = Array3::from_shape_fn((2, 3, 1), |(y, x, _)| (y * 3 + x) as u8);
        let mut buffers = [Array3::zeros((0, 0, 0)), Array3::zeros((0, 0, 0))];
        let mut stages = Stages::new(input.view(), &mut buffers);
        assert_eq!(stages.view(), input.view());

        stages.apply(flip_horizontal_into);
        assert_eq!(stages.current, Some(0));
        stages.apply(flip_horizontal_into);
        assert_eq!(stages.current, Some(1));
        stages.modify(|buf| buf.mapv_inplace(|v| v + 1));
        let out = stages.finish();
        assert_eq!(out, input.mapv(|v| v + 1));
    }

    #[test]
    fn test_finish_without_stages_copies_input() {
        let input = Array3::from_elem((2, 2, 3), 9u8);
        let mut buffers = [Array3::zeros((0, 0, 0)), Array3::zeros((0, 0, 0))];
        let out = Stages::new(input.view(), &mut buffers).finish();
        assert_eq!(out, input.view());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = AugmenterRegistry::with_defaults();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![SegAugmenter::NAME]);

        let augmenter = registry
            .create(SegAugmenter::NAME, AugmentConfig::new([3, 4, 4]))
            .unwrap();
        assert_eq!(augmenter.name(), SegAugmenter::NAME);

        assert!(matches!(
            registry.create("missing", AugmentConfig::new([3, 4, 4])),
            Err(Error::UnknownAugmenter(_))
        ));
    }

    #[test]
    fn test_registry_propagates_validation_errors() {
        let registry = AugmenterRegistry::with_defaults();
        assert!(registry
            .create(SegAugmenter::NAME, AugmentConfig::new([3, 0, 4]))
            .is_err());
    }
}
