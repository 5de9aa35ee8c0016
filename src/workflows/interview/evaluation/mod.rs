//! Evaluation engine: detection, aggregation, and decision selection behind a
//! single facade.
//!
//! The engine is stateless per evaluation. The snapshot is immutable and
//! `Arc`-shared, so one engine may serve many concurrent evaluations without
//! locking; external collaborators are injected once at construction.

pub(crate) mod detection;
pub(crate) mod formula;
pub(crate) mod policy;
pub(crate) mod scoring;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    CompetencyRating, HiringDecision, InterviewId, InterviewRecord, RedFlagMatch, RiskAnnotation,
};
use super::snapshot::EngineSnapshot;
use detection::RedFlagDetector;

pub use detection::{ExtractedFact, FactExtractor, PatternClassifier};
pub use formula::FormulaError;
pub use policy::{ConditionError, AUTO_REJECT_PRIORITY};

/// Per-request evaluation failure. Recoverable by the caller; the engine
/// never substitutes a default score or decision, so a failed evaluation is
/// always distinguishable from a REJECT.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("rating for '{dimension}' must be between 1 and 5, found {value}")]
    RatingOutOfRange { dimension: String, value: u8 },
    #[error("duplicate rating for dimension '{dimension}'")]
    DuplicateRating { dimension: String },
    #[error("missing rating for dimension '{dimension}'")]
    MissingRating { dimension: String },
    #[error("rating references unknown dimension '{dimension}'")]
    UnknownDimension { dimension: String },
    #[error("formula for score '{score}' failed: {source}")]
    Formula { score: String, source: FormulaError },
    #[error("score '{score}' missing during decision selection")]
    MissingScore { score: String },
    #[error("no decision rule matched; configuration is missing a catch-all")]
    NoMatchingDecision,
}

/// Discrete contribution to an evaluation, allowing transparent audits of how
/// a score came to be: base formula values, applied impacts, override caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub score_code: String,
    pub value: i64,
    pub notes: String,
}

/// Evaluation output describing the score map and decision trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub interview_id: InterviewId,
    pub decision: HiringDecision,
    /// Priority of the rule that decided, or [`AUTO_REJECT_PRIORITY`] when
    /// the auto-reject override fired.
    pub matched_rule_priority: i32,
    pub scores: BTreeMap<String, i64>,
    pub red_flag_matches: Vec<RedFlagMatch>,
    pub has_auto_reject_trigger: bool,
    pub risk_annotations: Vec<RiskAnnotation>,
    pub components: Vec<ScoreComponent>,
}

/// Stateless evaluator applying one configuration snapshot to interviews.
pub struct EvaluationEngine {
    snapshot: Arc<EngineSnapshot>,
    fact_extractor: Option<Arc<dyn FactExtractor>>,
    pattern_classifier: Option<Arc<dyn PatternClassifier>>,
}

impl EvaluationEngine {
    pub fn new(snapshot: Arc<EngineSnapshot>) -> Self {
        Self {
            snapshot,
            fact_extractor: None,
            pattern_classifier: None,
        }
    }

    /// Attach the collaborator backing `cross_reference` flags.
    pub fn with_fact_extractor(mut self, extractor: Arc<dyn FactExtractor>) -> Self {
        self.fact_extractor = Some(extractor);
        self
    }

    /// Attach the external classifier backing `pattern_analysis` flags.
    pub fn with_pattern_classifier(mut self, classifier: Arc<dyn PatternClassifier>) -> Self {
        self.pattern_classifier = Some(classifier);
        self
    }

    pub fn snapshot(&self) -> &EngineSnapshot {
        &self.snapshot
    }

    /// Run the full pipeline for one interview: detection, aggregation,
    /// decision. Pure with respect to its inputs; repeated evaluation of the
    /// same record yields an identical outcome.
    pub fn evaluate(
        &self,
        interview: &InterviewRecord,
    ) -> Result<EvaluationOutcome, EvaluationError> {
        let ratings = rating_map(&self.snapshot, &interview.ratings)?;

        let detector = RedFlagDetector::new(
            self.snapshot.red_flags(),
            self.fact_extractor.as_deref(),
            self.pattern_classifier.as_deref(),
        );
        let detection = detector.detect(&interview.transcript);

        let aggregated = scoring::aggregate(&self.snapshot, &ratings, &detection)?;
        let selected = policy::select_decision(&self.snapshot, &aggregated.scores, &detection)?;

        info!(
            interview = %interview.interview_id.0,
            conducted_on = %interview.conducted_on,
            decision = selected.decision.label(),
            priority = selected.matched_priority,
            "interview evaluated"
        );

        Ok(EvaluationOutcome {
            interview_id: interview.interview_id.clone(),
            decision: selected.decision,
            matched_rule_priority: selected.matched_priority,
            scores: aggregated.scores,
            red_flag_matches: detection.matches,
            has_auto_reject_trigger: detection.has_auto_reject_trigger,
            risk_annotations: aggregated.risk_annotations,
            components: aggregated.components,
        })
    }
}

/// Validate incoming ratings: known dimensions, 1-5 bounds, at most one per
/// dimension, and one present for every dimension a formula reads.
fn rating_map(
    snapshot: &EngineSnapshot,
    ratings: &[CompetencyRating],
) -> Result<BTreeMap<String, u8>, EvaluationError> {
    let mut map = BTreeMap::new();

    for rating in ratings {
        if !snapshot.has_dimension(&rating.dimension_code) {
            return Err(EvaluationError::UnknownDimension {
                dimension: rating.dimension_code.clone(),
            });
        }
        if !(1..=5).contains(&rating.value) {
            return Err(EvaluationError::RatingOutOfRange {
                dimension: rating.dimension_code.clone(),
                value: rating.value,
            });
        }
        if map.insert(rating.dimension_code.clone(), rating.value).is_some() {
            return Err(EvaluationError::DuplicateRating {
                dimension: rating.dimension_code.clone(),
            });
        }
    }

    for dimension in snapshot.required_dimensions() {
        if !map.contains_key(dimension) {
            return Err(EvaluationError::MissingRating {
                dimension: dimension.clone(),
            });
        }
    }

    Ok(map)
}
