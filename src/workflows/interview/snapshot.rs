//! Configuration compilation: raw entity collections are validated and
//! compiled once into an immutable [`EngineSnapshot`]. Every invariant that
//! can be checked ahead of time is checked here so evaluation never encounters
//! a malformed formula, a dangling impact target, or a fall-through decision
//! table. A snapshot is read-only for its lifetime; reloads are an atomic swap
//! of the whole snapshot by the host.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::domain::{
    CompetencyDimension, DecisionRule, HiringDecision, RedFlag, ScoreImpact, ScoreType,
    ScoringRule,
};
use super::evaluation::formula::{FormulaAst, FormulaError};
use super::evaluation::policy::{parse_condition, ConditionError, DecisionCondition};

/// Fatal configuration defect. Raised only while loading a snapshot; hosts
/// must treat it as a startup blocker, never a per-request failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("duplicate {kind} code '{code}'")]
    DuplicateCode { kind: &'static str, code: String },
    #[error("scoring rule '{rule}': {source}")]
    Formula { rule: String, source: FormulaError },
    #[error("scoring rule '{rule}' references competency '{code}' outside its source list")]
    UndeclaredCompetency { rule: String, code: String },
    #[error("scoring rule '{rule}' declares unknown competency '{code}'")]
    UnknownCompetency { rule: String, code: String },
    #[error("scoring rule '{rule}' references unknown red flag '{code}'")]
    UnknownRedFlag { rule: String, code: String },
    #[error("primary scoring rule '{rule}' may not aggregate red flags")]
    MisplacedRiskFormula { rule: String },
    #[error("risk scoring rule '{rule}' must aggregate red flags via from_red_flags")]
    MissingRiskFormula { rule: String },
    #[error("scoring rule '{rule}' clamp bounds are inverted ({min}..{max})")]
    InvertedBounds { rule: String, min: i64, max: i64 },
    #[error("primary scoring weights must sum to 100, found {found}")]
    WeightSum { found: u32 },
    #[error("red flag '{flag}' impact targets unknown score '{target}'")]
    UnknownImpactTarget { flag: String, target: String },
    #[error("decision rule '{decision}': {source}")]
    Condition {
        decision: &'static str,
        source: ConditionError,
    },
    #[error("decision rule '{decision}' references unknown score '{score}'")]
    UnknownConditionScore { decision: &'static str, score: String },
    #[error("decision rule '{decision}' uses reserved priority {priority}")]
    ReservedPriority { decision: &'static str, priority: i32 },
    #[error("decision rules '{first}' and '{second}' share priority {priority}")]
    DuplicatePriority {
        first: &'static str,
        second: &'static str,
        priority: i32,
    },
    #[error("decision rules must end with an unconditional catch-all")]
    MissingCatchAll,
}

/// Raw configuration entity collections as loaded from seed data or a rules
/// file. Inert until compiled by [`EngineSnapshot::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub dimensions: Vec<CompetencyDimension>,
    pub red_flags: Vec<RedFlag>,
    pub scoring_rules: Vec<ScoringRule>,
    pub decision_rules: Vec<DecisionRule>,
}

/// Scoring rule with its formula compiled to an AST, keeping the hot path
/// free of string parsing.
#[derive(Debug, Clone)]
pub(crate) struct CompiledScoringRule {
    pub rule: ScoringRule,
    pub formula: FormulaAst,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledDecisionRule {
    pub decision: HiringDecision,
    pub priority: i32,
    pub conditions: Vec<DecisionCondition>,
}

/// Immutable, validated configuration shared across concurrent evaluations.
#[derive(Debug)]
pub struct EngineSnapshot {
    dimensions: BTreeMap<String, CompetencyDimension>,
    red_flags: BTreeMap<String, RedFlag>,
    scoring: Vec<CompiledScoringRule>,
    /// Sorted by ascending priority.
    decisions: Vec<CompiledDecisionRule>,
    primary_codes: BTreeSet<String>,
    /// Dimensions some formula reads; a rating is required for each.
    required_dimensions: BTreeSet<String>,
}

impl EngineSnapshot {
    pub fn load(config: EngineConfig) -> Result<Self, ConfigurationError> {
        let dimensions = keyed_by_code(config.dimensions, "dimension", |dim| &dim.code)?;
        let red_flags = keyed_by_code(config.red_flags, "red flag", |flag| &flag.code)?;

        let scoring = compile_scoring_rules(config.scoring_rules, &dimensions, &red_flags)?;
        validate_weights(&scoring)?;

        let score_codes: BTreeSet<String> = scoring
            .iter()
            .map(|compiled| compiled.rule.code.clone())
            .collect();
        validate_impact_targets(&red_flags, &score_codes)?;

        let decisions = compile_decision_rules(config.decision_rules, &score_codes)?;

        let primary_codes = scoring
            .iter()
            .filter(|compiled| compiled.rule.score_type == ScoreType::Primary)
            .map(|compiled| compiled.rule.code.clone())
            .collect();
        let required_dimensions = scoring
            .iter()
            .flat_map(|compiled| compiled.formula.competency_refs())
            .map(str::to_string)
            .collect();

        Ok(Self {
            dimensions,
            red_flags,
            scoring,
            decisions,
            primary_codes,
            required_dimensions,
        })
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &CompetencyDimension> {
        self.dimensions.values()
    }

    pub fn has_dimension(&self, code: &str) -> bool {
        self.dimensions.contains_key(code)
    }

    /// Every score code the aggregator will produce, overall excluded.
    pub fn score_codes(&self) -> impl Iterator<Item = &str> {
        self.scoring.iter().map(|compiled| compiled.rule.code.as_str())
    }

    pub(crate) fn scoring_rules(&self) -> &[CompiledScoringRule] {
        &self.scoring
    }

    pub(crate) fn decision_rules(&self) -> &[CompiledDecisionRule] {
        &self.decisions
    }

    pub(crate) fn red_flags(&self) -> &BTreeMap<String, RedFlag> {
        &self.red_flags
    }

    pub(crate) fn red_flag(&self, code: &str) -> Option<&RedFlag> {
        self.red_flags.get(code)
    }

    pub(crate) fn is_primary_score(&self, code: &str) -> bool {
        self.primary_codes.contains(code)
    }

    pub(crate) fn required_dimensions(&self) -> &BTreeSet<String> {
        &self.required_dimensions
    }
}

fn keyed_by_code<T>(
    entries: Vec<T>,
    kind: &'static str,
    code: impl Fn(&T) -> &String,
) -> Result<BTreeMap<String, T>, ConfigurationError> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let key = code(&entry).clone();
        if map.insert(key.clone(), entry).is_some() {
            return Err(ConfigurationError::DuplicateCode { kind, code: key });
        }
    }
    Ok(map)
}

fn compile_scoring_rules(
    rules: Vec<ScoringRule>,
    dimensions: &BTreeMap<String, CompetencyDimension>,
    red_flags: &BTreeMap<String, RedFlag>,
) -> Result<Vec<CompiledScoringRule>, ConfigurationError> {
    let mut compiled = Vec::with_capacity(rules.len());
    let mut seen = BTreeSet::new();

    for rule in rules {
        if !seen.insert(rule.code.clone()) {
            return Err(ConfigurationError::DuplicateCode {
                kind: "scoring rule",
                code: rule.code,
            });
        }
        if rule.min_value > rule.max_value {
            return Err(ConfigurationError::InvertedBounds {
                rule: rule.code,
                min: rule.min_value,
                max: rule.max_value,
            });
        }

        let formula =
            FormulaAst::parse(&rule.formula).map_err(|source| ConfigurationError::Formula {
                rule: rule.code.clone(),
                source,
            })?;

        for code in formula.competency_refs() {
            if !rule.source_competencies.iter().any(|source| source == code) {
                return Err(ConfigurationError::UndeclaredCompetency {
                    rule: rule.code,
                    code: code.to_string(),
                });
            }
        }
        for code in &rule.source_competencies {
            if !dimensions.contains_key(code) {
                return Err(ConfigurationError::UnknownCompetency {
                    rule: rule.code,
                    code: code.clone(),
                });
            }
        }
        for code in formula.red_flag_refs() {
            if !red_flags.contains_key(code) {
                return Err(ConfigurationError::UnknownRedFlag {
                    rule: rule.code,
                    code: code.to_string(),
                });
            }
        }

        match rule.score_type {
            ScoreType::Primary if formula.references_red_flags() => {
                return Err(ConfigurationError::MisplacedRiskFormula { rule: rule.code });
            }
            ScoreType::Risk if !formula.references_red_flags() => {
                return Err(ConfigurationError::MissingRiskFormula { rule: rule.code });
            }
            _ => {}
        }

        compiled.push(CompiledScoringRule { rule, formula });
    }

    Ok(compiled)
}

/// Weights must sum to exactly 100 across primary rules. A mismatch is a
/// deploy-time configuration error, never a runtime one.
fn validate_weights(scoring: &[CompiledScoringRule]) -> Result<(), ConfigurationError> {
    let found: u32 = scoring
        .iter()
        .filter(|compiled| compiled.rule.score_type == ScoreType::Primary)
        .map(|compiled| compiled.rule.weight_percent)
        .sum();
    if found != 100 {
        return Err(ConfigurationError::WeightSum { found });
    }
    Ok(())
}

fn validate_impact_targets(
    red_flags: &BTreeMap<String, RedFlag>,
    score_codes: &BTreeSet<String>,
) -> Result<(), ConfigurationError> {
    for flag in red_flags.values() {
        for impact in &flag.impacts {
            if !score_codes.contains(&impact.target) {
                return Err(ConfigurationError::UnknownImpactTarget {
                    flag: flag.code.clone(),
                    target: impact.target.clone(),
                });
            }
        }
    }
    Ok(())
}

fn compile_decision_rules(
    rules: Vec<DecisionRule>,
    score_codes: &BTreeSet<String>,
) -> Result<Vec<CompiledDecisionRule>, ConfigurationError> {
    let mut compiled = Vec::with_capacity(rules.len());

    for rule in rules {
        let decision = rule.decision;
        if rule.priority < 1 {
            return Err(ConfigurationError::ReservedPriority {
                decision: decision.label(),
                priority: rule.priority,
            });
        }

        let mut conditions = Vec::with_capacity(rule.conditions.len());
        for raw in &rule.conditions {
            let condition = parse_condition(raw).map_err(|source| ConfigurationError::Condition {
                decision: decision.label(),
                source,
            })?;
            if let Some(score) = condition.score_ref() {
                let known = score == super::evaluation::scoring::OVERALL_SCORE
                    || score_codes.contains(score);
                if !known {
                    return Err(ConfigurationError::UnknownConditionScore {
                        decision: decision.label(),
                        score: score.to_string(),
                    });
                }
            }
            conditions.push(condition);
        }

        compiled.push(CompiledDecisionRule {
            decision,
            priority: rule.priority,
            conditions,
        });
    }

    compiled.sort_by_key(|rule| rule.priority);
    for pair in compiled.windows(2) {
        if pair[0].priority == pair[1].priority {
            return Err(ConfigurationError::DuplicatePriority {
                first: pair[0].decision.label(),
                second: pair[1].decision.label(),
                priority: pair[0].priority,
            });
        }
    }

    // The last rule guards the remaining score space so evaluation never
    // falls through.
    let has_catch_all = compiled
        .last()
        .is_some_and(|rule| rule.conditions.is_empty());
    if !has_catch_all {
        return Err(ConfigurationError::MissingCatchAll);
    }

    Ok(compiled)
}

impl EngineConfig {
    /// Built-in rubric seeded for interview evaluation deployments. Turkish
    /// trigger phrases are stored lowercase ASCII, matching transcript
    /// normalization upstream.
    pub fn standard() -> Self {
        Self {
            dimensions: standard_dimensions(),
            red_flags: standard_red_flags(),
            scoring_rules: standard_scoring_rules(),
            decision_rules: standard_decision_rules(),
        }
    }
}

fn dimension(code: &str, weight_default: f32, description: &str) -> CompetencyDimension {
    CompetencyDimension {
        code: code.to_string(),
        weight_default,
        description: description.to_string(),
    }
}

fn standard_dimensions() -> Vec<CompetencyDimension> {
    vec![
        dimension(
            "communication",
            0.15,
            "Clarity and structure of spoken responses.",
        ),
        dimension(
            "accountability",
            0.10,
            "Ownership of outcomes and mistakes.",
        ),
        dimension(
            "teamwork",
            0.15,
            "Collaboration and credit-sharing in team settings.",
        ),
        dimension(
            "stress_resilience",
            0.10,
            "Composure under pressure and setbacks.",
        ),
        dimension(
            "adaptability",
            0.10,
            "Comfort with changing priorities and tools.",
        ),
        dimension(
            "learning_agility",
            0.10,
            "Speed of picking up new domains.",
        ),
        dimension(
            "integrity",
            0.10,
            "Consistency and honesty across answers.",
        ),
        dimension(
            "role_competence",
            0.20,
            "Depth in the skills the role requires.",
        ),
    ]
}

fn impact(target: &str, delta: i32) -> ScoreImpact {
    ScoreImpact {
        target: target.to_string(),
        delta,
    }
}

fn standard_red_flags() -> Vec<RedFlag> {
    use super::domain::DetectionMethod::{CrossReference, PatternAnalysis, PhraseMatch};
    use super::domain::RedFlagSeverity::{Critical, High, Low, Medium};

    vec![
        RedFlag {
            code: "RF_AGGRESSION".to_string(),
            severity: Critical,
            detection_method: PhraseMatch,
            trigger_phrases: vec![
                "kirarim".to_string(),
                "yumruk atarim".to_string(),
                "kavga ederim".to_string(),
            ],
            behavioral_patterns: Vec::new(),
            impacts: vec![impact("team_fit_score", -40), impact("team_risk", 50)],
            causes_auto_reject: true,
            max_score_override: None,
        },
        RedFlag {
            code: "RF_BLAME".to_string(),
            severity: High,
            detection_method: PhraseMatch,
            trigger_phrases: vec![
                "bana soylemediler".to_string(),
                "benim sucum degil".to_string(),
                "onlar yuzunden".to_string(),
            ],
            behavioral_patterns: Vec::new(),
            impacts: vec![
                impact("accountability_score", -30),
                impact("reliability_score", -15),
                impact("team_fit_score", -10),
                impact("team_risk", 20),
            ],
            causes_auto_reject: false,
            max_score_override: None,
        },
        RedFlag {
            code: "RF_EGO".to_string(),
            severity: Medium,
            detection_method: PhraseMatch,
            trigger_phrases: vec![
                "ben olmasam".to_string(),
                "hepsini ben yaptim".to_string(),
                "tek basima kurtardim".to_string(),
            ],
            behavioral_patterns: Vec::new(),
            impacts: vec![impact("team_fit_score", -25), impact("team_risk", 30)],
            causes_auto_reject: false,
            max_score_override: None,
        },
        RedFlag {
            code: "RF_DISHONESTY".to_string(),
            severity: Critical,
            detection_method: PhraseMatch,
            trigger_phrases: vec![
                "yalan soyledim".to_string(),
                "fark etmezler".to_string(),
            ],
            behavioral_patterns: Vec::new(),
            impacts: vec![impact("integrity_score", -40), impact("integrity_risk", 60)],
            causes_auto_reject: false,
            max_score_override: Some(49),
        },
        RedFlag {
            code: "RF_INCONSISTENT".to_string(),
            severity: High,
            detection_method: CrossReference,
            trigger_phrases: Vec::new(),
            behavioral_patterns: Vec::new(),
            impacts: vec![impact("integrity_score", -15), impact("integrity_risk", 35)],
            causes_auto_reject: false,
            max_score_override: None,
        },
        RedFlag {
            code: "RF_JOB_HOPPING".to_string(),
            severity: Medium,
            detection_method: PhraseMatch,
            trigger_phrases: vec![
                "hemen istifa ettim".to_string(),
                "sikilinca ayrildim".to_string(),
            ],
            behavioral_patterns: Vec::new(),
            impacts: vec![impact("reliability_score", -10), impact("stability_risk", 35)],
            causes_auto_reject: false,
            max_score_override: None,
        },
        RedFlag {
            code: "RF_BURNOUT".to_string(),
            severity: Low,
            detection_method: PhraseMatch,
            trigger_phrases: vec![
                "tukendim".to_string(),
                "hicbir sey yapmak istemiyorum".to_string(),
            ],
            behavioral_patterns: Vec::new(),
            impacts: vec![impact("stability_risk", 20)],
            causes_auto_reject: false,
            max_score_override: None,
        },
        RedFlag {
            code: "RF_LOW_OWNERSHIP".to_string(),
            severity: Medium,
            detection_method: PatternAnalysis,
            trigger_phrases: Vec::new(),
            behavioral_patterns: vec![
                "Deflects ownership of failures onto teammates across multiple answers"
                    .to_string(),
                "Describes outcomes passively, as things that happened to them".to_string(),
            ],
            impacts: vec![impact("accountability_score", -15)],
            causes_auto_reject: false,
            max_score_override: None,
        },
    ]
}

fn primary_rule(code: &str, sources: &[&str], formula: &str, weight_percent: u32) -> ScoringRule {
    ScoringRule {
        code: code.to_string(),
        score_type: ScoreType::Primary,
        source_competencies: sources.iter().map(|s| s.to_string()).collect(),
        formula: formula.to_string(),
        weight_percent,
        min_value: 0,
        max_value: 100,
        warning_threshold: None,
        critical_threshold: None,
    }
}

fn risk_rule(code: &str, formula: &str, warning: i64, critical: i64) -> ScoringRule {
    ScoringRule {
        code: code.to_string(),
        score_type: ScoreType::Risk,
        source_competencies: Vec::new(),
        formula: formula.to_string(),
        weight_percent: 0,
        min_value: 0,
        max_value: 100,
        warning_threshold: Some(warning),
        critical_threshold: Some(critical),
    }
}

fn standard_scoring_rules() -> Vec<ScoringRule> {
    vec![
        primary_rule("communication_score", &["communication"], "communication * 20", 15),
        primary_rule(
            "accountability_score",
            &["accountability"],
            "accountability * 20",
            10,
        ),
        primary_rule(
            "team_fit_score",
            &["teamwork", "adaptability"],
            "average(teamwork, adaptability) * 20",
            15,
        ),
        primary_rule(
            "reliability_score",
            &["accountability", "integrity"],
            "average(accountability, integrity) * 20",
            10,
        ),
        primary_rule(
            "resilience_score",
            &["stress_resilience", "adaptability"],
            "average(stress_resilience, adaptability) * 20",
            10,
        ),
        primary_rule(
            "learning_score",
            &["learning_agility"],
            "learning_agility * 20",
            10,
        ),
        primary_rule("integrity_score", &["integrity"], "integrity * 20", 10),
        primary_rule(
            "job_fit_score",
            &["role_competence", "learning_agility"],
            "average(role_competence, learning_agility) * 20",
            20,
        ),
        risk_rule(
            "integrity_risk",
            "from_red_flags(RF_DISHONESTY, RF_INCONSISTENT)",
            40,
            70,
        ),
        risk_rule(
            "team_risk",
            "from_red_flags(RF_AGGRESSION, RF_EGO, RF_BLAME)",
            40,
            70,
        ),
        risk_rule(
            "stability_risk",
            "from_red_flags(RF_JOB_HOPPING, RF_BURNOUT)",
            35,
            60,
        ),
    ]
}

fn standard_decision_rules() -> Vec<DecisionRule> {
    vec![
        DecisionRule {
            decision: HiringDecision::Hire,
            conditions: vec![
                "overall_score >= 75".to_string(),
                "integrity_risk < 40".to_string(),
                "team_risk < 40".to_string(),
                "no critical_red_flags".to_string(),
            ],
            priority: 1,
        },
        DecisionRule {
            decision: HiringDecision::Hold,
            conditions: vec![
                "overall_score >= 60".to_string(),
                "overall_score < 75".to_string(),
                "no critical_red_flags".to_string(),
            ],
            priority: 2,
        },
        DecisionRule {
            decision: HiringDecision::Reject,
            conditions: Vec::new(),
            priority: 3,
        },
    ]
}
