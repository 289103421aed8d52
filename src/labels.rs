/// Label-id remapping and left/right class swapping for `(H, W, 1)` masks
use ndarray::{Array3, ArrayView3, Zip};
use std::collections::HashMap;

use crate::geometry::ensure_shape;

/// Mask value meaning "no training signal at this pixel"
pub const IGNORE_LABEL: u8 = 255;

/// Raw dataset class id -> training class id
pub type LabelIdMap = HashMap<u8, u8>;

/// Copy `src` into `dst`, replacing every raw id found in `map`.
///
/// Matching is done against `src`, so a pixel is rewritten at most once even
/// when a train id is also a raw id of another entry. Ids missing from the
/// map pass through unchanged.
pub fn remap_labels_into(src: ArrayView3<'_, u8>, dst: &mut Array3<u8>, map: &LabelIdMap) {
    ensure_shape(dst, src.dim());
    if map.is_empty() {
        dst.assign(&src);
        return;
    }
    Zip::from(dst).and(&src).for_each(|out, &raw| {
        *out = map.get(&raw).copied().unwrap_or(raw);
    });
}

/// A pair of mirrored class ids (e.g. left / right lane markings)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanePair {
    pub left: u8,
    pub right: u8,
}

impl LanePair {
    /// Both ids must lie in `[0, 255)` and differ; otherwise no swapping
    /// is configured.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(left: i32, right: i32) -> Option<Self> {
        let valid = |id: i32| (0..i32::from(IGNORE_LABEL)).contains(&id);
        (valid(left) && valid(right) && left != right).then(|| LanePair {
            left: left as u8,
            right: right as u8,
        })
    }
}

/// Swap every `left` pixel with `right` and vice versa, simultaneously.
pub fn swap_lanes(mask: &mut Array3<u8>, pair: LanePair) {
    mask.mapv_inplace(|v| {
        if v == pair.left {
            pair.right
        } else if v == pair.right {
            pair.left
        } else {
            v
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(values: &[u8], w: usize) -> Array3<u8> {
        Array3::from_shape_vec((values.len() / w, w, 1), values.to_vec()).unwrap()
    }

    #[test]
    fn test_remap_passes_unmapped_ids_through() {
        let src = mask(&[0, 1, 2, 3], 2);
        let map = LabelIdMap::from([(0, 10), (2, 20)]);
        let mut dst = Array3::zeros((0, 0, 0));
        remap_labels_into(src.view(), &mut dst, &map);
        assert_eq!(dst.into_raw_vec(), vec![10, 1, 20, 3]);
    }

    #[test]
    fn test_remap_does_not_chain() {
        let src = mask(&[1, 2, 1, 2], 2);
        let map = LabelIdMap::from([(1, 2), (2, 3)]);
        let mut dst = Array3::zeros((0, 0, 0));
        remap_labels_into(src.view(), &mut dst, &map);
        assert_eq!(dst.into_raw_vec(), vec![2, 3, 2, 3]);
    }

    #[test]
    fn test_identity_remap_is_noop() {
        let src = mask(&[0, 5, 7, 255, 5, 0], 3);
        let map: LabelIdMap = [0, 5, 7, 255].into_iter().map(|id| (id, id)).collect();
        let mut dst = Array3::zeros((0, 0, 0));
        remap_labels_into(src.view(), &mut dst, &map);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_lane_pair_validation() {
        assert_eq!(LanePair::new(1, 2), Some(LanePair { left: 1, right: 2 }));
        assert_eq!(LanePair::new(-1, 2), None);
        assert_eq!(LanePair::new(1, 255), None);
        assert_eq!(LanePair::new(3, 3), None);
    }

    #[test]
    fn test_swap_lanes_is_involution() {
        let original = mask(&[1, 2, 0, 2, 1, 255], 3);
        let pair = LanePair::new(1, 2).unwrap();
        let mut swapped = original.clone();
        swap_lanes(&mut swapped, pair);
        assert_eq!(swapped.clone().into_raw_vec(), vec![2, 1, 0, 1, 2, 255]);
        swap_lanes(&mut swapped, pair);
        assert_eq!(swapped, original);
    }
}
