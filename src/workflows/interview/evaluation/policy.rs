//! Decision selection: ordered rule evaluation over the aggregated score map,
//! with the auto-reject override checked before any rule runs.

use std::collections::BTreeMap;

use super::super::domain::{HiringDecision, RedFlagSeverity};
use super::super::snapshot::EngineSnapshot;
use super::detection::DetectionReport;
use super::EvaluationError;

/// Priority reported when the auto-reject override fires. Configured rules
/// must use priorities >= 1, enforced at load.
pub const AUTO_REJECT_PRIORITY: i32 = 0;

/// Failure raised while parsing a decision rule condition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("unparseable condition '{0}'")]
    Syntax(String),
    #[error("condition '{0}' compares against a non-integer threshold")]
    Threshold(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparisonOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

/// Typed predicate compiled from a condition string at configuration load.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DecisionCondition {
    Compare {
        score: String,
        op: ComparisonOp,
        value: i64,
    },
    /// `no <severity>_red_flags`: no active match carries that severity.
    NoFlagsAtSeverity(RedFlagSeverity),
}

impl DecisionCondition {
    /// Score code this condition reads, if any, for load-time validation.
    pub(crate) fn score_ref(&self) -> Option<&str> {
        match self {
            DecisionCondition::Compare { score, .. } => Some(score),
            DecisionCondition::NoFlagsAtSeverity(_) => None,
        }
    }
}

const COMPARISONS: [(&str, ComparisonOp); 5] = [
    (">=", ComparisonOp::Ge),
    ("<=", ComparisonOp::Le),
    ("==", ComparisonOp::Eq),
    (">", ComparisonOp::Gt),
    ("<", ComparisonOp::Lt),
];

pub(crate) fn parse_condition(input: &str) -> Result<DecisionCondition, ConditionError> {
    let trimmed = input.trim();

    if let Some(rest) = trimmed.strip_prefix("no ") {
        let severity = rest
            .trim()
            .strip_suffix("_red_flags")
            .and_then(RedFlagSeverity::from_label)
            .ok_or_else(|| ConditionError::Syntax(trimmed.to_string()))?;
        return Ok(DecisionCondition::NoFlagsAtSeverity(severity));
    }

    for (symbol, op) in COMPARISONS {
        let Some((lhs, rhs)) = trimmed.split_once(symbol) else {
            continue;
        };
        let score = lhs.trim();
        if score.is_empty() {
            return Err(ConditionError::Syntax(trimmed.to_string()));
        }
        let value = rhs
            .trim()
            .parse::<i64>()
            .map_err(|_| ConditionError::Threshold(trimmed.to_string()))?;
        return Ok(DecisionCondition::Compare {
            score: score.to_string(),
            op,
            value,
        });
    }

    Err(ConditionError::Syntax(trimmed.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectedDecision {
    pub decision: HiringDecision,
    pub matched_priority: i32,
}

/// First matching rule by ascending priority wins. The auto-reject trigger is
/// a hard override checked before rule iteration, not a condition.
pub(crate) fn select_decision(
    snapshot: &EngineSnapshot,
    scores: &BTreeMap<String, i64>,
    detection: &DetectionReport,
) -> Result<SelectedDecision, EvaluationError> {
    if detection.has_auto_reject_trigger {
        return Ok(SelectedDecision {
            decision: HiringDecision::Reject,
            matched_priority: AUTO_REJECT_PRIORITY,
        });
    }

    for rule in snapshot.decision_rules() {
        let mut all_hold = true;
        for condition in &rule.conditions {
            if !condition_holds(condition, scores, detection)? {
                all_hold = false;
                break;
            }
        }
        if all_hold {
            return Ok(SelectedDecision {
                decision: rule.decision,
                matched_priority: rule.priority,
            });
        }
    }

    // Unreachable when the load-time catch-all invariant holds.
    Err(EvaluationError::NoMatchingDecision)
}

fn condition_holds(
    condition: &DecisionCondition,
    scores: &BTreeMap<String, i64>,
    detection: &DetectionReport,
) -> Result<bool, EvaluationError> {
    match condition {
        DecisionCondition::Compare { score, op, value } => {
            let actual = *scores
                .get(score)
                .ok_or_else(|| EvaluationError::MissingScore {
                    score: score.clone(),
                })?;
            Ok(match op {
                ComparisonOp::Ge => actual >= *value,
                ComparisonOp::Le => actual <= *value,
                ComparisonOp::Gt => actual > *value,
                ComparisonOp::Lt => actual < *value,
                ComparisonOp::Eq => actual == *value,
            })
        }
        DecisionCondition::NoFlagsAtSeverity(severity) => Ok(detection
            .matches
            .iter()
            .all(|record| record.severity != *severity)),
    }
}
