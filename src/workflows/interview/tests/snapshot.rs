use crate::workflows::interview::domain::ScoreType;
use crate::workflows::interview::{ConfigurationError, EngineConfig, EngineSnapshot};

fn standard() -> EngineConfig {
    EngineConfig::standard()
}

fn scoring_rule_mut<'a>(
    config: &'a mut EngineConfig,
    code: &str,
) -> &'a mut crate::workflows::interview::ScoringRule {
    config
        .scoring_rules
        .iter_mut()
        .find(|rule| rule.code == code)
        .expect("rule present in standard rubric")
}

#[test]
fn standard_rubric_loads() {
    let snapshot = EngineSnapshot::load(standard()).expect("standard rubric loads");

    assert_eq!(snapshot.dimensions().count(), 8);
    assert_eq!(snapshot.score_codes().count(), 11);
    assert!(snapshot.has_dimension("communication"));
    assert!(snapshot
        .dimensions()
        .all(|dimension| dimension.weight_default > 0.0));
}

#[test]
fn weights_must_sum_to_exactly_one_hundred() {
    let mut config = standard();
    scoring_rule_mut(&mut config, "communication_score").weight_percent = 20;

    match EngineSnapshot::load(config) {
        Err(ConfigurationError::WeightSum { found }) => assert_eq!(found, 105),
        other => panic!("expected weight sum error, got {other:?}"),
    }
}

#[test]
fn duplicate_dimension_codes_are_rejected() {
    let mut config = standard();
    let duplicate = config.dimensions[0].clone();
    config.dimensions.push(duplicate);

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::DuplicateCode {
            kind: "dimension",
            ..
        })
    ));
}

#[test]
fn formula_syntax_errors_fail_the_load() {
    let mut config = standard();
    scoring_rule_mut(&mut config, "communication_score").formula = "communication +".to_string();

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::Formula { .. })
    ));
}

#[test]
fn formulas_may_only_reference_declared_competencies() {
    let mut config = standard();
    scoring_rule_mut(&mut config, "communication_score").formula =
        "average(communication, teamwork) * 20".to_string();

    match EngineSnapshot::load(config) {
        Err(ConfigurationError::UndeclaredCompetency { rule, code }) => {
            assert_eq!(rule, "communication_score");
            assert_eq!(code, "teamwork");
        }
        other => panic!("expected undeclared competency error, got {other:?}"),
    }
}

#[test]
fn declared_competencies_must_exist() {
    let mut config = standard();
    scoring_rule_mut(&mut config, "communication_score")
        .source_competencies
        .push("charisma".to_string());

    match EngineSnapshot::load(config) {
        Err(ConfigurationError::UnknownCompetency { code, .. }) => assert_eq!(code, "charisma"),
        other => panic!("expected unknown competency error, got {other:?}"),
    }
}

#[test]
fn risk_formulas_must_reference_known_red_flags() {
    let mut config = standard();
    scoring_rule_mut(&mut config, "integrity_risk").formula =
        "from_red_flags(RF_GHOST)".to_string();

    match EngineSnapshot::load(config) {
        Err(ConfigurationError::UnknownRedFlag { code, .. }) => assert_eq!(code, "RF_GHOST"),
        other => panic!("expected unknown red flag error, got {other:?}"),
    }
}

#[test]
fn primary_rules_may_not_aggregate_red_flags() {
    let mut config = standard();
    let rule = scoring_rule_mut(&mut config, "communication_score");
    rule.formula = "from_red_flags(RF_EGO)".to_string();

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::MisplacedRiskFormula { .. })
    ));
}

#[test]
fn risk_rules_must_aggregate_red_flags() {
    let mut config = standard();
    let rule = scoring_rule_mut(&mut config, "integrity_risk");
    rule.score_type = ScoreType::Risk;
    rule.source_competencies = vec!["integrity".to_string()];
    rule.formula = "integrity * 20".to_string();

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::MissingRiskFormula { .. })
    ));
}

#[test]
fn inverted_clamp_bounds_are_rejected() {
    let mut config = standard();
    let rule = scoring_rule_mut(&mut config, "communication_score");
    rule.min_value = 80;
    rule.max_value = 20;

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::InvertedBounds { .. })
    ));
}

#[test]
fn impact_targets_are_validated_against_score_names() {
    let mut config = standard();
    let flag = config
        .red_flags
        .iter_mut()
        .find(|flag| flag.code == "RF_EGO")
        .expect("flag present");
    flag.impacts[0].target = "team_fit".to_string();

    match EngineSnapshot::load(config) {
        Err(ConfigurationError::UnknownImpactTarget { flag, target }) => {
            assert_eq!(flag, "RF_EGO");
            assert_eq!(target, "team_fit");
        }
        other => panic!("expected unknown impact target error, got {other:?}"),
    }
}

#[test]
fn decision_conditions_are_validated_against_score_names() {
    let mut config = standard();
    config.decision_rules[0]
        .conditions
        .push("charisma_score >= 10".to_string());

    match EngineSnapshot::load(config) {
        Err(ConfigurationError::UnknownConditionScore { score, .. }) => {
            assert_eq!(score, "charisma_score");
        }
        other => panic!("expected unknown condition score error, got {other:?}"),
    }
}

#[test]
fn malformed_decision_conditions_fail_the_load() {
    let mut config = standard();
    config.decision_rules[0]
        .conditions
        .push("overall_score resembles greatness".to_string());

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::Condition { .. })
    ));
}

#[test]
fn decision_rules_require_an_unconditional_catch_all() {
    let mut config = standard();
    let last = config
        .decision_rules
        .last_mut()
        .expect("standard rubric has decision rules");
    last.conditions.push("overall_score >= 0".to_string());

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::MissingCatchAll)
    ));
}

#[test]
fn priority_zero_is_reserved_for_auto_reject() {
    let mut config = standard();
    config.decision_rules[0].priority = 0;

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::ReservedPriority { priority: 0, .. })
    ));
}

#[test]
fn duplicate_priorities_are_rejected() {
    let mut config = standard();
    config.decision_rules[1].priority = config.decision_rules[0].priority;

    assert!(matches!(
        EngineSnapshot::load(config),
        Err(ConfigurationError::DuplicatePriority { .. })
    ));
}

#[test]
fn decision_rules_are_sorted_by_ascending_priority() {
    let mut config = standard();
    config.decision_rules.reverse();

    let snapshot = EngineSnapshot::load(config).expect("order in the file does not matter");
    let priorities: Vec<i32> = snapshot
        .decision_rules()
        .iter()
        .map(|rule| rule.priority)
        .collect();
    assert_eq!(priorities, vec![1, 2, 3]);
}
