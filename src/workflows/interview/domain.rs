use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for evaluated interviews.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterviewId(pub String);

/// A named trait rated during an interview, e.g. communication or accountability.
///
/// Reference data: created at configuration time, never mutated during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyDimension {
    pub code: String,
    /// Informational default weighting; authoritative weights live on scoring rules.
    pub weight_default: f32,
    pub description: String,
}

/// One interviewer- or model-assigned score for a dimension, integer 1-5 inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyRating {
    pub dimension_code: String,
    pub value: u8,
}

/// Severity carried by a red flag and copied verbatim onto its matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlagSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RedFlagSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            RedFlagSeverity::Low => "low",
            RedFlagSeverity::Medium => "medium",
            RedFlagSeverity::High => "high",
            RedFlagSeverity::Critical => "critical",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "low" => Some(RedFlagSeverity::Low),
            "medium" => Some(RedFlagSeverity::Medium),
            "high" => Some(RedFlagSeverity::High),
            "critical" => Some(RedFlagSeverity::Critical),
            _ => None,
        }
    }
}

/// How a red flag is detected against transcript answers.
///
/// Only `phrase_match` and `cross_reference` have deterministic in-crate
/// implementations; `pattern_analysis` requires an external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    PhraseMatch,
    PatternAnalysis,
    CrossReference,
}

/// Signed adjustment a triggered flag applies to a named score.
///
/// Targets are validated against the configured score names at load so a typo
/// fails startup instead of silently no-opping at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreImpact {
    pub target: String,
    pub delta: i32,
}

/// A named behavioral risk pattern scanned for in transcript answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    pub code: String,
    pub severity: RedFlagSeverity,
    pub detection_method: DetectionMethod,
    /// Literal substrings, matched case-insensitively.
    #[serde(default)]
    pub trigger_phrases: Vec<String>,
    /// Advisory heuristics for a human reviewer or an external classifier.
    #[serde(default)]
    pub behavioral_patterns: Vec<String>,
    #[serde(default)]
    pub impacts: Vec<ScoreImpact>,
    #[serde(default)]
    pub causes_auto_reject: bool,
    /// Ceiling applied to the overall score when this flag is triggered.
    #[serde(default)]
    pub max_score_override: Option<i64>,
}

/// Runtime record of one flag firing against one answer. Produced fresh per
/// evaluation, never persisted as configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlagMatch {
    pub flag_code: String,
    pub answer_id: String,
    /// The trigger phrase, behavioral pattern, or fact conflict that matched.
    pub matched: String,
    pub severity: RedFlagSeverity,
    pub confidence: f32,
}

/// Whether a scoring rule produces a competency composite or an accumulated risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    Primary,
    Risk,
}

impl ScoreType {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreType::Primary => "primary",
            ScoreType::Risk => "risk",
        }
    }
}

/// Defines how one named score is computed from ratings or active red flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub code: String,
    pub score_type: ScoreType,
    /// Dimension codes the formula may reference.
    #[serde(default)]
    pub source_competencies: Vec<String>,
    pub formula: String,
    /// Share of the overall score, percent. Primary rules must sum to 100.
    #[serde(default)]
    pub weight_percent: u32,
    #[serde(default = "default_min_value")]
    pub min_value: i64,
    #[serde(default = "default_max_value")]
    pub max_value: i64,
    #[serde(default)]
    pub warning_threshold: Option<i64>,
    #[serde(default)]
    pub critical_threshold: Option<i64>,
}

fn default_min_value() -> i64 {
    0
}

fn default_max_value() -> i64 {
    100
}

/// Terminal outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HiringDecision {
    Hire,
    Hold,
    Reject,
}

impl HiringDecision {
    pub const fn label(self) -> &'static str {
        match self {
            HiringDecision::Hire => "HIRE",
            HiringDecision::Hold => "HOLD",
            HiringDecision::Reject => "REJECT",
        }
    }
}

/// An ordered, condition-gated mapping from the score map to a decision.
///
/// Priorities start at 1; priority 0 is reserved for the auto-reject override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRule {
    pub decision: HiringDecision,
    /// Boolean predicates over score names, e.g. `overall_score >= 75` or
    /// `no critical_red_flags`. All must hold for the rule to match.
    #[serde(default)]
    pub conditions: Vec<String>,
    pub priority: i32,
}

/// One transcript answer captured during the interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptAnswer {
    pub answer_id: String,
    pub text: String,
}

/// Full per-interview input consumed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub interview_id: InterviewId,
    pub conducted_on: NaiveDate,
    pub ratings: Vec<CompetencyRating>,
    /// Answers in interview order.
    pub transcript: Vec<TranscriptAnswer>,
}

/// Risk level a risk score reached relative to its configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Warning,
    Critical,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Warning => "warning",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Annotation emitted when a risk score crosses a configured threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAnnotation {
    pub score_code: String,
    pub value: i64,
    pub level: RiskLevel,
}
