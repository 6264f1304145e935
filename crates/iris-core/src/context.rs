//! State of one processing run.

use tracing::warn;

use crate::align::{AffineTransform, Aligner, ImageTransform, StarMatchAligner};
use crate::config::RunConfig;
use crate::consts::REFERENCE_FILE_NAME;
use crate::error::Result;
use crate::fit::{MomentStarFitter, StarFitter};
use crate::io::cube::CubeSet;
use crate::io::loader::{FitsDualCameraDecoder, ImageDecoder};
use crate::io::reference::ReferenceStore;
use crate::stats::baseline::reference_odometer;
use crate::stats::FrameStatsRecord;

/// A run: its configuration, its reference store and output cubes (both
/// under `config.data_dir`) and the collaborators used to process exposures.
///
/// Operations on a run must not be interleaved: the store and the cubes
/// have a single writer.
pub struct RunContext {
    config: RunConfig,
    store: ReferenceStore,
    cubes: CubeSet,
    decoder: Box<dyn ImageDecoder>,
    aligner: Box<dyn Aligner>,
    fitter: Box<dyn StarFitter>,
    transform: Box<dyn ImageTransform>,
}

impl RunContext {
    /// Run with the default collaborators.
    pub fn new(config: RunConfig) -> Self {
        let store = ReferenceStore::new(config.data_dir.join(REFERENCE_FILE_NAME));
        let cubes = CubeSet::new(config.data_dir.clone());
        let aligner = StarMatchAligner::new(config.detection.clone());
        Self {
            config,
            store,
            cubes,
            decoder: Box::new(FitsDualCameraDecoder),
            aligner: Box::new(aligner),
            fitter: Box::new(MomentStarFitter),
            transform: Box::new(AffineTransform),
        }
    }

    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn with_aligner(mut self, aligner: impl Aligner + 'static) -> Self {
        self.aligner = Box::new(aligner);
        self
    }

    pub fn with_fitter(mut self, fitter: impl StarFitter + 'static) -> Self {
        self.fitter = Box::new(fitter);
        self
    }

    pub fn with_transform(mut self, transform: impl ImageTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    pub fn cubes(&self) -> &CubeSet {
        &self.cubes
    }

    pub fn decoder(&self) -> &dyn ImageDecoder {
        self.decoder.as_ref()
    }

    pub fn aligner(&self) -> &dyn Aligner {
        self.aligner.as_ref()
    }

    pub fn fitter(&self) -> &dyn StarFitter {
        self.fitter.as_ref()
    }

    pub fn transform(&self) -> &dyn ImageTransform {
        self.transform.as_ref()
    }

    /// Whether a reference baseline has been established.
    pub fn has_baseline(&self) -> Result<bool> {
        Ok(reference_odometer(&self.store)?.is_some())
    }

    /// Stored statistics of `odometer`, `None` if it has not been
    /// summarized yet.
    pub fn frame_stats(&self, odometer: i64) -> Result<Option<FrameStatsRecord>> {
        let Some(attrs) = self.store.attributes(&odometer.to_string())? else {
            return Ok(None);
        };
        let record = FrameStatsRecord::from_attributes(&attrs);
        if record.is_none() {
            warn!(odometer, "Stored statistics have no odometer number");
        }
        Ok(record)
    }
}
