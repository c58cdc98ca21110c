use std::fmt;

/// Stages reported while an evaluation runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvaluationStage {
    Ranking,
    Accuracy,
    FMeasure,
    BetaMeasures,
    Challenge,
}

impl EvaluationStage {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Ranking => "AUROC and AUPRC",
            Self::Accuracy => "accuracy",
            Self::FMeasure => "F-measure",
            Self::BetaMeasures => "F-beta and G-beta measures",
            Self::Challenge => "challenge metric",
        }
    }
}

impl fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Observer for reporting which metric is being computed.
pub trait EvaluationProgressObserver {
    fn on_stage_start(&mut self, stage: EvaluationStage, num_classes: usize) {
        let _ = (stage, num_classes);
    }
    fn on_stage_finish(&mut self, stage: EvaluationStage) {
        let _ = stage;
    }
    fn on_evaluation_finish(&mut self) {}
}

#[derive(Default)]
pub struct NoopProgress;

impl EvaluationProgressObserver for NoopProgress {}

/// Forwards stage transitions to the `log` facade at info level.
#[derive(Default)]
pub struct LogProgress;

impl EvaluationProgressObserver for LogProgress {
    fn on_stage_start(&mut self, stage: EvaluationStage, num_classes: usize) {
        log::info!("- {stage} ({num_classes} classes)...");
    }

    fn on_evaluation_finish(&mut self) {
        log::info!("Done.");
    }
}
