use std::fmt;

/// Stages reported while running a PCA.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PcaStage {
    LogRatio,
    Correlation,
    Eigen,
    Projection,
}

impl PcaStage {
    pub fn describe(self) -> &'static str {
        match self {
            Self::LogRatio => "log-ratio transform",
            Self::Correlation => "correlation matrix",
            Self::Eigen => "Jacobi eigendecomposition",
            Self::Projection => "score projection",
        }
    }
}

impl fmt::Display for PcaStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Observer for reporting stage transitions while fitting a PCA.
pub trait PcaProgressObserver {
    fn on_stage_start(&mut self, stage: PcaStage, work_items: usize) {
        let _ = (stage, work_items);
    }
    fn on_stage_finish(&mut self, stage: PcaStage) {
        let _ = stage;
    }
}

#[derive(Default)]
pub struct NoopPcaProgress;

impl PcaProgressObserver for NoopPcaProgress {}

/// Records every stage event, in order. Mostly useful in tests.
#[derive(Default, Debug)]
pub struct RecordingPcaProgress {
    pub events: Vec<(PcaStage, bool)>,
}

impl PcaProgressObserver for RecordingPcaProgress {
    fn on_stage_start(&mut self, stage: PcaStage, work_items: usize) {
        let _ = work_items;
        self.events.push((stage, false));
    }
    fn on_stage_finish(&mut self, stage: PcaStage) {
        self.events.push((stage, true));
    }
}
