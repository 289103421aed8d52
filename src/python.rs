#![allow(clippy::useless_conversion)]
use ndarray::{Array2, Array3, Axis};
use numpy::{IntoPyArray, PyArray2, PyArray3, PyReadonlyArray2, PyReadonlyArray3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyBytes;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

use crate::augmenter::{Augmenter, Workspace};
use crate::config::AugmentConfig;
use crate::error::Error;
use crate::labels::LabelIdMap;
use crate::record::SegRecord;
use crate::seg;

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Python module for segmentation augmentation (_core submodule)
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<SegAugmenter>()?;
    m.add_function(wrap_pyfunction!(load_record, m)?)?;
    Ok(())
}

/// Split a packed record and decode it into `(image, mask, image_id)`.
#[pyfunction]
#[allow(clippy::type_complexity)]
pub fn load_record(
    py: Python<'_>,
    buf: &Bound<'_, PyBytes>,
) -> PyResult<(Py<PyArray3<u8>>, Py<PyArray2<u8>>, u64)> {
    let bytes = buf.as_bytes().to_vec();
    let (image, mask, index) = py.allow_threads(move || {
        let record = SegRecord::load(&bytes)?;
        let (image, mask) = record.decode()?;
        Ok::<_, Error>((image, mask, record.header.image_index()))
    })?;
    Ok((
        image.into_pyarray_bound(py).unbind(),
        mask.index_axis_move(Axis(2), 0).into_pyarray_bound(py).unbind(),
        index,
    ))
}

/// Segmentation augmenter with its own scratch space and generator.
///
/// One instance serves one Python worker; create one per data-loader process.
#[pyclass(name = "SegAugmenter")]
pub struct SegAugmenter {
    augmenter: seg::SegAugmenter,
    workspace: Workspace,
    rng: StdRng,
}

#[pymethods]
impl SegAugmenter {
    #[new]
    #[pyo3(signature = (config_json, seed=None))]
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config_json: &str, seed: Option<u64>) -> PyResult<Self> {
        let config = AugmentConfig::from_json_str(config_json)?;
        let augmenter = seg::SegAugmenter::new(config)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(SegAugmenter {
            augmenter,
            workspace: Workspace::new(),
            rng,
        })
    }

    /// Augment a BGR `(H, W, 3)` image and its `(H, W)` mask together.
    #[pyo3(signature = (image, mask, label_id_map=None))]
    #[allow(clippy::needless_pass_by_value, clippy::type_complexity)]
    pub fn process(
        &mut self,
        py: Python<'_>,
        image: PyReadonlyArray3<u8>,
        mask: PyReadonlyArray2<u8>,
        label_id_map: Option<HashMap<u8, u8>>,
    ) -> PyResult<(Py<PyArray3<u8>>, Py<PyArray2<u8>>)> {
        let image = image.as_array().to_owned();
        let mask = mask.as_array().insert_axis(Axis(2)).to_owned();
        let label_map: LabelIdMap = label_id_map.unwrap_or_default();

        let augmenter = &self.augmenter;
        let workspace = &mut self.workspace;
        let rng = &mut self.rng;
        let (out_image, out_mask) = py.allow_threads(|| {
            let sample = augmenter.process_with_mask(
                image.view(),
                mask.view(),
                rng,
                &label_map,
                workspace,
            )?;
            let out_mask: Array2<u8> = sample.mask.index_axis(Axis(2), 0).to_owned();
            Ok::<_, Error>((sample.image.to_owned(), out_mask))
        })?;

        Ok((
            out_image.into_pyarray_bound(py).unbind(),
            out_mask.into_pyarray_bound(py).unbind(),
        ))
    }

    /// Augment a BGR `(H, W, 3)` image that has no mask.
    #[allow(clippy::needless_pass_by_value)]
    pub fn process_image(
        &mut self,
        py: Python<'_>,
        image: PyReadonlyArray3<u8>,
    ) -> PyResult<Py<PyArray3<u8>>> {
        let image = image.as_array().to_owned();
        let augmenter = &self.augmenter;
        let workspace = &mut self.workspace;
        let rng = &mut self.rng;
        let out: Array3<u8> = py.allow_threads(|| {
            augmenter
                .process_image(image.view(), rng, workspace)
                .map(|view| view.to_owned())
        })?;
        Ok(out.into_pyarray_bound(py).unbind())
    }

    /// Output `(channels, height, width)`
    #[getter]
    pub fn data_shape(&self) -> (usize, usize, usize) {
        let [c, h, w] = self.augmenter.config().data_shape;
        (c, h, w)
    }
}
