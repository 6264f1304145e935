//! Reference baseline of a run: the alignment and star lists every later
//! exposure is measured with.

use ndarray::Array2;
use tracing::info;

use crate::align::{AlignmentModel, AlignmentResult};
use crate::error::{IrisError, Result};
use crate::frame::StarPosition;
use crate::io::reference::{Dataset, ReferenceStore, Value};

pub const ALIGN_PARAMS_KEY: &str = "align-params";
pub const RC_KEY: &str = "rc";
pub const ZOOM_FACTOR_KEY: &str = "zoom-factor";
pub const STAR_LIST1_KEY: &str = "star-list1";
pub const STAR_LIST2_KEY: &str = "star-list2";
pub const FWHM_ARC_KEY: &str = "fwhm-arc";
pub const REF_ODOMETER_KEY: &str = "ref-odometer";

#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceBaseline {
    pub model: AlignmentModel,
    pub star_list1: Vec<StarPosition>,
    pub star_list2: Vec<StarPosition>,
    pub fwhm_arc: f64,
    pub odometer: i64,
}

impl ReferenceBaseline {
    pub fn from_alignment(alignment: AlignmentResult, odometer: i64) -> Self {
        Self {
            model: alignment.model,
            star_list1: alignment.star_list1,
            star_list2: alignment.star_list2,
            fwhm_arc: alignment.fwhm_arc,
            odometer,
        }
    }

    /// Replace whatever the store holds with this baseline. The store is
    /// erased first, so nothing of a previous baseline (or of the frames
    /// measured against it) survives.
    pub fn save(&self, store: &ReferenceStore) -> Result<()> {
        store.reset()?;
        let m = &self.model;
        store.put_many(vec![
            (ALIGN_PARAMS_KEY.into(), Dataset::vector(m.coefficients().to_vec())),
            (RC_KEY.into(), Dataset::vector(vec![m.rc.0, m.rc.1])),
            (ZOOM_FACTOR_KEY.into(), Dataset::vector(vec![m.zoom.0, m.zoom.1])),
            (STAR_LIST1_KEY.into(), star_list_dataset(&self.star_list1)),
            (STAR_LIST2_KEY.into(), star_list_dataset(&self.star_list2)),
            (FWHM_ARC_KEY.into(), Dataset::scalar(self.fwhm_arc)),
            (REF_ODOMETER_KEY.into(), Dataset::scalar(self.odometer as f64)),
        ])?;
        info!(
            odometer = self.odometer,
            stars = self.star_list1.len(),
            path = %store.path().display(),
            "Reference baseline written"
        );
        Ok(())
    }

    /// Baseline stored in `store`, `None` if there is none yet.
    pub fn load(store: &ReferenceStore) -> Result<Option<Self>> {
        let keys: Vec<String> = [
            ALIGN_PARAMS_KEY,
            RC_KEY,
            ZOOM_FACTOR_KEY,
            STAR_LIST1_KEY,
            STAR_LIST2_KEY,
            FWHM_ARC_KEY,
            REF_ODOMETER_KEY,
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        let mut values = store.get_many(&keys)?;
        if values.iter().all(Option::is_none) {
            return Ok(None);
        }
        let mut take = |i: usize| -> Result<Value> {
            values[i]
                .take()
                .ok_or_else(|| IrisError::NotFound(keys[i].clone()))
        };

        let coefficients = take(0)?.into_vec();
        let rc = take(1)?.into_vec();
        let zoom = take(2)?.into_vec();
        let model = AlignmentModel::from_parts(&coefficients, &rc, &zoom).ok_or_else(|| {
            IrisError::InvalidDataset(format!(
                "bad alignment parameters {:?} rc {:?} zoom {:?}",
                coefficients, rc, zoom
            ))
        })?;
        let star_list1 = star_list_from(take(3)?.into_dataset())?;
        let star_list2 = star_list_from(take(4)?.into_dataset())?;
        let fwhm_arc = scalar(take(5)?, FWHM_ARC_KEY)?;
        let odometer = scalar(take(6)?, REF_ODOMETER_KEY)? as i64;

        Ok(Some(Self {
            model,
            star_list1,
            star_list2,
            fwhm_arc,
            odometer,
        }))
    }
}

/// Reference odometer number recorded in `store`, if any.
pub fn reference_odometer(store: &ReferenceStore) -> Result<Option<i64>> {
    Ok(store
        .get(REF_ODOMETER_KEY)?
        .and_then(|v| v.as_scalar())
        .map(|v| v as i64))
}

fn scalar(value: Value, key: &str) -> Result<f64> {
    value
        .as_scalar()
        .ok_or_else(|| IrisError::InvalidDataset(format!("{} must be a scalar", key)))
}

fn star_list_dataset(stars: &[StarPosition]) -> Dataset {
    let array = Array2::from_shape_fn((stars.len(), 2), |(i, j)| {
        if j == 0 {
            stars[i].x
        } else {
            stars[i].y
        }
    });
    Dataset::matrix(&array)
}

fn star_list_from(dataset: Dataset) -> Result<Vec<StarPosition>> {
    let array = dataset.to_array2()?;
    if array.ncols() != 2 {
        return Err(IrisError::InvalidDataset(format!(
            "star list must have 2 columns, got shape {:?}",
            dataset.shape
        )));
    }
    Ok(array
        .rows()
        .into_iter()
        .map(|r| StarPosition::new(r[0], r[1]))
        .collect())
}
