//! Interview evaluation workflow: configuration snapshot, red flag
//! detection, formula-driven scoring, and ordered decision selection.

pub mod domain;
pub(crate) mod evaluation;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use domain::{
    CompetencyDimension, CompetencyRating, DecisionRule, DetectionMethod, HiringDecision,
    InterviewId, InterviewRecord, RedFlag, RedFlagMatch, RedFlagSeverity, RiskAnnotation,
    RiskLevel, ScoreImpact, ScoreType, ScoringRule, TranscriptAnswer,
};
pub use evaluation::{
    ConditionError, EvaluationEngine, EvaluationError, EvaluationOutcome, ExtractedFact,
    FactExtractor, FormulaError, PatternClassifier, ScoreComponent, AUTO_REJECT_PRIORITY,
};
pub use snapshot::{ConfigurationError, EngineConfig, EngineSnapshot};
