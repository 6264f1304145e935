//! Per-frame statistics of a whole cube, for display.

use std::path::Path;

use tracing::warn;

use crate::consts::REFERENCE_FILE_NAME;
use crate::error::Result;
use crate::io::cube::CubeReader;
use crate::io::reference::ReferenceStore;
use crate::stats::FrameStatsRecord;

/// One cube frame and whatever statistics could be found for it.
#[derive(Clone, Debug)]
pub struct FrameHistoryEntry {
    pub index: usize,
    pub odometer: Option<i64>,
    pub stats: Option<FrameStatsRecord>,
}

/// Reference store of the run a cube belongs to (same directory).
pub fn reference_store_for(cube_path: &Path) -> ReferenceStore {
    let dir = cube_path.parent().unwrap_or_else(|| Path::new(""));
    ReferenceStore::new(dir.join(REFERENCE_FILE_NAME))
}

/// Statistics of every frame of the cube at `cube_path`.
///
/// Failing to read one frame's odometer or statistics is logged and that
/// frame comes back without statistics; only an unreadable cube fails.
pub fn load_history(cube_path: &Path, store: &ReferenceStore) -> Result<Vec<FrameHistoryEntry>> {
    let cube = CubeReader::open(cube_path)?;
    let entries = (0..cube.frame_count())
        .map(|index| {
            let odometer = match cube.frame_odometer(index) {
                Ok(o) => Some(o),
                Err(e) => {
                    warn!(index, error = %e, "Cannot read frame odometer");
                    None
                }
            };
            let stats = odometer.and_then(|o| match store.attributes(&o.to_string()) {
                Ok(attrs) => attrs.and_then(|a| FrameStatsRecord::from_attributes(&a)),
                Err(e) => {
                    warn!(index, odometer = o, error = %e, "Cannot read frame statistics");
                    None
                }
            });
            FrameHistoryEntry {
                index,
                odometer,
                stats,
            }
        })
        .collect();
    Ok(entries)
}

/// One statistic across the history, `None` where a frame has none.
pub fn series(history: &[FrameHistoryEntry], key: &str) -> Vec<Option<f64>> {
    history
        .iter()
        .map(|e| {
            e.stats
                .as_ref()
                .and_then(|s| s.get(key))
                .map(|v| v.as_f64())
        })
        .collect()
}
