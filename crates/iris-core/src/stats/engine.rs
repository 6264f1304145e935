//! Per-exposure orchestration.
//!
//! `ingest` loads an exposure, establishes or reuses the reference baseline,
//! builds the merged frame, fits the reference stars in the three camera
//! slots and writes fits and frames out. `summarize` turns the stored fits of
//! one odometer into a `FrameStatsRecord` without writing anything, and
//! `persist` stores that record as attributes of the odometer's group.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::align::InitialGuess;
use crate::context::RunContext;
use crate::error::{IrisError, Result};
use crate::fit::{FitContext, FitOptions};
use crate::frame::{Camera, StarFitResult, StarParam};
use crate::io::loader::load_exposure;
use crate::io::reference::{Dataset, ReferenceStore};
use crate::merge::merge_frames;

use super::aggregate::{median, percentile};
use super::baseline::{reference_odometer, ReferenceBaseline};
use super::measure::Measure;
use super::progress::{IngestStage, NoOpReporter, ProgressReporter};
use super::record::FrameStatsRecord;

/// What `ingest` did with an exposure.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestOutcome {
    pub odometer: i64,
    /// The exposure became the new reference baseline.
    pub refreshed: bool,
    /// Slot of the exposure in the three output cubes.
    pub frame_index: usize,
    pub star_count: usize,
}

/// The three star fits of one exposure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraFits {
    pub cam1: StarFitResult,
    pub cam2: StarFitResult,
    pub merged: StarFitResult,
}

impl CameraFits {
    pub fn get(&self, camera: Camera) -> &StarFitResult {
        match camera {
            Camera::One => &self.cam1,
            Camera::Two => &self.cam2,
            Camera::Merged => &self.merged,
        }
    }
}

/// Dataset path of one fitted parameter: `"{odometer}/cam1/x"`.
pub fn fit_key(odometer: i64, camera: Camera, param: StarParam) -> String {
    format!("{}/{}/{}", odometer, camera.group_name(), param.name())
}

/// Ingest an exposure. See `ingest_reported`.
pub fn ingest(ctx: &RunContext, image_path: &Path, force_refresh: bool) -> Result<IngestOutcome> {
    ingest_reported(ctx, image_path, force_refresh, Arc::new(NoOpReporter))
}

/// Ingest an exposure, reporting progress.
///
/// The exposure becomes the reference baseline if `force_refresh` is set
/// or if the run has none yet. The output cubes are checked against the
/// exposure up front and everything is computed before the first write, so
/// a failing exposure leaves the store and the cubes untouched.
pub fn ingest_reported(
    ctx: &RunContext,
    image_path: &Path,
    force_refresh: bool,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<IngestOutcome> {
    let config = ctx.config();
    let store = ctx.store();

    reporter.begin_stage(IngestStage::Loading, None);
    let exposure = load_exposure(ctx.decoder(), image_path, &config.odometer_keyword)?;
    reporter.finish_stage();
    let odometer = exposure.odometer;
    let pixel_scale = config.pixel_scale(exposure.dimx());

    let existing = if force_refresh {
        None
    } else {
        ReferenceBaseline::load(store)?
    };
    let refresh = existing.is_none();
    let (height, width) = exposure.im1.dim();
    let frames = ctx.cubes().prepare(odometer, width, height, refresh)?;
    info!(
        odometer,
        refresh,
        path = %image_path.display(),
        "Ingesting exposure"
    );

    let baseline = match existing {
        Some(baseline) => baseline,
        None => {
            reporter.begin_stage(IngestStage::Alignment, None);
            let start = Instant::now();
            let guess = InitialGuess {
                angle_deg: config.init_angle_deg,
                dx: config.init_dx,
                dy: config.init_dy,
                fwhm_arc: config.init_fwhm_arc,
                pixel_scale,
            };
            let alignment = ctx
                .aligner()
                .compute_alignment(&exposure.im1, &exposure.im2, &guess)?;
            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Cameras aligned"
            );
            reporter.finish_stage();
            ReferenceBaseline::from_alignment(alignment, odometer)
        }
    };

    reporter.begin_stage(IngestStage::Merging, None);
    let start = Instant::now();
    let fwhm_pix = baseline.fwhm_arc / pixel_scale;
    let merged = merge_frames(
        &exposure.im1,
        &exposure.im2,
        &baseline.star_list1,
        fwhm_pix,
        config.merge_window_multiplier,
        &baseline.model,
        ctx.transform(),
    )?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Merged frame built"
    );
    reporter.finish_stage();

    reporter.begin_stage(IngestStage::Fitting, Some(3));
    let ctx1 = FitContext::new(baseline.star_list1.clone(), baseline.fwhm_arc, pixel_scale);
    let ctx2 = FitContext::new(baseline.star_list2.clone(), baseline.fwhm_arc, pixel_scale);
    let fitter = ctx.fitter();
    let start = Instant::now();
    let (cam1, cam2) = rayon::join(
        || fitter.fit_stars(&exposure.im1, &ctx1, FitOptions::full_fit()),
        || fitter.fit_stars(&exposure.im2, &ctx2, FitOptions::full_fit()),
    );
    let (cam1, cam2) = (cam1?, cam2?);
    reporter.advance(2);
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        stars = cam1.len(),
        "Stars fitted in cameras 1 and 2"
    );
    let start = Instant::now();
    let merged_fit = fitter.fit_stars(&merged, &ctx1, FitOptions::photometry_only())?;
    reporter.advance(3);
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Photometry computed on merged frame"
    );
    reporter.finish_stage();
    let fits = CameraFits {
        cam1,
        cam2,
        merged: merged_fit,
    };

    reporter.begin_stage(IngestStage::Writing, None);
    if refresh {
        baseline.save(store)?;
    }
    save_fits(store, odometer, &fits)?;
    let frame_index = frames.commit(&exposure.im1, &exposure.im2, &merged)?;
    reporter.finish_stage();

    info!(odometer, frame_index, refresh, "Exposure ingested");
    Ok(IngestOutcome {
        odometer,
        refreshed: refresh,
        frame_index,
        star_count: fits.cam1.len(),
    })
}

/// Write the three fits of `odometer`, replacing earlier ones.
pub fn save_fits(store: &ReferenceStore, odometer: i64, fits: &CameraFits) -> Result<()> {
    let mut datasets = Vec::with_capacity(3 * StarParam::ALL.len());
    for camera in Camera::ALL {
        let fit = fits.get(camera);
        for param in StarParam::ALL {
            datasets.push((
                fit_key(odometer, camera, param),
                Dataset::vector(fit.column(param)),
            ));
        }
    }
    store.put_many(datasets)?;
    debug!(odometer, "Star fits saved");
    Ok(())
}

/// Read back the three fits of `odometer`. Fails with `NotFound` if the
/// exposure was never ingested.
pub fn load_fits(store: &ReferenceStore, odometer: i64) -> Result<CameraFits> {
    let keys: Vec<String> = Camera::ALL
        .iter()
        .flat_map(|&camera| {
            StarParam::ALL
                .iter()
                .map(move |&param| fit_key(odometer, camera, param))
        })
        .collect();
    let mut values = store.get_many(&keys)?.into_iter().zip(keys.iter());

    let mut fits = CameraFits::default();
    for camera in Camera::ALL {
        let mut columns = Vec::with_capacity(StarParam::ALL.len());
        for param in StarParam::ALL {
            let (value, key) = values
                .next()
                .ok_or_else(|| IrisError::NotFound(fit_key(odometer, camera, param)))?;
            let value = value.ok_or_else(|| IrisError::NotFound(key.clone()))?;
            columns.push((param, value.into_vec()));
        }
        let fit = StarFitResult::from_columns(&columns);
        match camera {
            Camera::One => fits.cam1 = fit,
            Camera::Two => fits.cam2 = fit,
            Camera::Merged => fits.merged = fit,
        }
    }
    Ok(fits)
}

/// Statistics of an ingested exposure, computed from its stored fits and
/// those of the reference exposure. Reads only.
pub fn summarize(ctx: &RunContext, odometer: i64) -> Result<FrameStatsRecord> {
    let store = ctx.store();
    let ref_odometer = reference_odometer(store)?
        .ok_or_else(|| IrisError::NoReference(store.path().to_path_buf()))?;

    let current = load_fits(store, odometer)?;
    let record = if odometer == ref_odometer {
        summarize_fits(odometer, &current, None, ctx.config().fwhm_percentile)
    } else {
        let reference = load_fits(store, ref_odometer)?;
        summarize_fits(
            odometer,
            &current,
            Some(&reference),
            ctx.config().fwhm_percentile,
        )
    };
    debug!(odometer, ref_odometer, "Statistics computed");
    Ok(record)
}

/// Store `record` as the attributes of its odometer group, replacing any
/// previous statistics of that odometer.
pub fn persist(ctx: &RunContext, record: &FrameStatsRecord) -> Result<()> {
    ctx.store()
        .replace_attributes(&record.odometer.to_string(), record.to_attributes())?;
    debug!(odometer = record.odometer, "Statistics persisted");
    Ok(())
}

/// Pure statistics computation.
///
/// `reference` is `None` when `current` is the reference exposure itself:
/// shifts are then exactly zero and the flux is compared with itself.
/// All aggregation skips non-finite per-star values.
pub fn summarize_fits(
    odometer: i64,
    current: &CameraFits,
    reference: Option<&CameraFits>,
    fwhm_percentile: f64,
) -> FrameStatsRecord {
    let col = |fit: &StarFitResult, p: StarParam| fit.column(p);

    // The shift error is the current frame's median fit error alone.
    let shift = |camera: Camera, pos: StarParam, err: StarParam| -> Measure {
        let fit = current.get(camera);
        let error = median(&col(fit, err));
        match reference {
            None => Measure::new(0.0, error),
            Some(r) => Measure::new(
                median(&col(fit, pos)) - median(&col(r.get(camera), pos)),
                error,
            ),
        }
    };
    let fwhm = |fit: &StarFitResult, value: StarParam, err: StarParam| {
        Measure::new(
            percentile(&col(fit, value), fwhm_percentile),
            median(&col(fit, err)),
        )
    };
    let median_of = |fit: &StarFitResult, value: StarParam, err: StarParam| {
        Measure::new(median(&col(fit, value)), median(&col(fit, err)))
    };

    let flux = median_of(
        &current.merged,
        StarParam::ApertureFlux,
        StarParam::ApertureFluxErr,
    );
    let ref_flux = match reference {
        Some(r) => median_of(
            &r.merged,
            StarParam::ApertureFlux,
            StarParam::ApertureFluxErr,
        ),
        None => flux,
    };

    FrameStatsRecord {
        odometer,
        star_nb: current.cam1.len(),
        dx_pix_1: shift(Camera::One, StarParam::X, StarParam::XErr),
        dy_pix_1: shift(Camera::One, StarParam::Y, StarParam::YErr),
        dx_pix_2: shift(Camera::Two, StarParam::X, StarParam::XErr),
        dy_pix_2: shift(Camera::Two, StarParam::Y, StarParam::YErr),
        fwhm_pix_1: fwhm(&current.cam1, StarParam::FwhmPix, StarParam::FwhmErr),
        fwhm_pix_2: fwhm(&current.cam2, StarParam::FwhmPix, StarParam::FwhmErr),
        fwhm_arc_1: fwhm(&current.cam1, StarParam::FwhmArc, StarParam::FwhmArcErr),
        fwhm_arc_2: fwhm(&current.cam2, StarParam::FwhmArc, StarParam::FwhmArcErr),
        flux,
        extinction: flux.magnitude_against(ref_flux),
        background: median_of(
            &current.merged,
            StarParam::ApertureBackground,
            StarParam::ApertureBackgroundErr,
        ),
    }
}
