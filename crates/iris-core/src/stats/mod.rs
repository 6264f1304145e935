//! Frame statistics against the reference baseline.

pub mod aggregate;
pub mod baseline;
pub mod engine;
pub mod measure;
pub mod progress;
pub mod record;

pub use baseline::ReferenceBaseline;
pub use engine::{ingest, ingest_reported, persist, summarize, summarize_fits, CameraFits, IngestOutcome};
pub use measure::Measure;
pub use progress::{IngestStage, ProgressReporter};
pub use record::FrameStatsRecord;
