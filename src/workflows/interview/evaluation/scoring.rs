//! Score aggregation: base primary scores, red-flag risk scores, impact
//! deltas, the weight-normalized overall score, and override ceilings.

use std::collections::BTreeMap;

use tracing::debug;

use super::super::domain::{RiskAnnotation, RiskLevel, ScoreType};
use super::super::snapshot::EngineSnapshot;
use super::detection::DetectionReport;
use super::formula::ScoringContext;
use super::{EvaluationError, ScoreComponent};

pub(crate) const OVERALL_SCORE: &str = "overall_score";

#[derive(Debug, Clone)]
pub(crate) struct AggregatedScores {
    pub scores: BTreeMap<String, i64>,
    pub components: Vec<ScoreComponent>,
    pub risk_annotations: Vec<RiskAnnotation>,
}

pub(crate) fn aggregate(
    snapshot: &EngineSnapshot,
    ratings: &BTreeMap<String, u8>,
    detection: &DetectionReport,
) -> Result<AggregatedScores, EvaluationError> {
    let active_flags = detection.active_flag_codes();
    let mut scores = BTreeMap::new();
    let mut components = Vec::new();

    // Base scores: primaries over ratings, risks over active matches.
    for compiled in snapshot.scoring_rules() {
        let rule = &compiled.rule;
        let context = ScoringContext {
            ratings,
            active_flags: &active_flags,
            red_flags: snapshot.red_flags(),
            target_score: &rule.code,
        };
        let raw = compiled
            .formula
            .evaluate(&context)
            .map_err(|source| EvaluationError::Formula {
                score: rule.code.clone(),
                source,
            })?;
        let value = clamp_round(raw, rule.min_value, rule.max_value);
        components.push(ScoreComponent {
            score_code: rule.code.clone(),
            value,
            notes: format!(
                "{} '{}' evaluated to {raw:.2}",
                rule.score_type.label(),
                rule.formula
            ),
        });
        scores.insert(rule.code.clone(), value);
    }

    // Primary-score impact deltas, additive, in sorted match order.
    for record in &detection.matches {
        let Some(flag) = snapshot.red_flag(&record.flag_code) else {
            continue;
        };
        for impact in &flag.impacts {
            if !snapshot.is_primary_score(&impact.target) {
                continue;
            }
            if let Some(value) = scores.get_mut(&impact.target) {
                *value += impact.delta as i64;
                components.push(ScoreComponent {
                    score_code: impact.target.clone(),
                    value: impact.delta as i64,
                    notes: format!("{} impact from answer {}", flag.code, record.answer_id),
                });
            }
        }
    }

    // Re-clamp after impacts.
    for compiled in snapshot.scoring_rules() {
        let rule = &compiled.rule;
        if let Some(value) = scores.get_mut(&rule.code) {
            *value = (*value).clamp(rule.min_value, rule.max_value);
        }
    }

    // Overall: weight-normalized sum of post-impact primary scores.
    let mut weighted = 0.0;
    for compiled in snapshot.scoring_rules() {
        let rule = &compiled.rule;
        if rule.score_type != ScoreType::Primary {
            continue;
        }
        if let Some(value) = scores.get(&rule.code) {
            weighted += *value as f64 * rule.weight_percent as f64;
        }
    }
    let mut overall = clamp_round(weighted / 100.0, 0, 100);
    components.push(ScoreComponent {
        score_code: OVERALL_SCORE.to_string(),
        value: overall,
        notes: "weight-normalized sum of primary scores".to_string(),
    });

    // Strictest ceiling among active overrides wins.
    let ceiling = detection
        .matches
        .iter()
        .filter_map(|record| snapshot.red_flag(&record.flag_code))
        .filter_map(|flag| flag.max_score_override)
        .min();
    if let Some(ceiling) = ceiling {
        if overall > ceiling {
            components.push(ScoreComponent {
                score_code: OVERALL_SCORE.to_string(),
                value: ceiling,
                notes: format!("capped from {overall} by max score override"),
            });
            overall = ceiling;
        }
    }
    scores.insert(OVERALL_SCORE.to_string(), overall);

    let risk_annotations = annotate_risks(snapshot, &scores);

    debug!(overall, risks = risk_annotations.len(), "scores aggregated");

    Ok(AggregatedScores {
        scores,
        components,
        risk_annotations,
    })
}

fn annotate_risks(snapshot: &EngineSnapshot, scores: &BTreeMap<String, i64>) -> Vec<RiskAnnotation> {
    let mut annotations = Vec::new();

    for compiled in snapshot.scoring_rules() {
        let rule = &compiled.rule;
        if rule.score_type != ScoreType::Risk {
            continue;
        }
        let Some(&value) = scores.get(&rule.code) else {
            continue;
        };
        let level = match (rule.warning_threshold, rule.critical_threshold) {
            (_, Some(critical)) if value >= critical => Some(RiskLevel::Critical),
            (Some(warning), _) if value >= warning => Some(RiskLevel::Warning),
            _ => None,
        };
        if let Some(level) = level {
            debug!(score = %rule.code, value, level = level.label(), "risk threshold crossed");
            annotations.push(RiskAnnotation {
                score_code: rule.code.clone(),
                value,
                level,
            });
        }
    }

    annotations
}

/// Scores are integers; rounding is half-to-even at the point of clamping to
/// avoid bias across many evaluations.
fn clamp_round(raw: f64, min: i64, max: i64) -> i64 {
    (raw.round_ties_even() as i64).clamp(min, max)
}
