/// Stage of an exposure ingestion, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestStage {
    Loading,
    Alignment,
    Merging,
    Fitting,
    Writing,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading exposure"),
            Self::Alignment => write!(f, "Aligning cameras"),
            Self::Merging => write!(f, "Merging frames"),
            Self::Fitting => write!(f, "Fitting stars"),
            Self::Writing => write!(f, "Writing results"),
        }
    }
}

/// Thread-safe progress reporting for ingestion.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items
    /// in this stage, if known.
    fn begin_stage(&self, _stage: IngestStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `ingest` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
