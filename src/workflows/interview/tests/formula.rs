use std::collections::{BTreeMap, BTreeSet};

use crate::workflows::interview::domain::{
    DetectionMethod, RedFlag, RedFlagSeverity, ScoreImpact,
};
use crate::workflows::interview::evaluation::formula::{FormulaAst, FormulaError, ScoringContext};

fn flag(code: &str, impacts: &[(&str, i32)]) -> RedFlag {
    RedFlag {
        code: code.to_string(),
        severity: RedFlagSeverity::Medium,
        detection_method: DetectionMethod::PhraseMatch,
        trigger_phrases: Vec::new(),
        behavioral_patterns: Vec::new(),
        impacts: impacts
            .iter()
            .map(|(target, delta)| ScoreImpact {
                target: target.to_string(),
                delta: *delta,
            })
            .collect(),
        causes_auto_reject: false,
        max_score_override: None,
    }
}

fn ratings(values: &[(&str, u8)]) -> BTreeMap<String, u8> {
    values
        .iter()
        .map(|(code, value)| (code.to_string(), *value))
        .collect()
}

#[test]
fn parses_scaled_identifier() {
    let ast = FormulaAst::parse("communication * 20").expect("valid formula");
    assert_eq!(
        ast,
        FormulaAst::Scaled {
            term: Box::new(FormulaAst::Rating("communication".to_string())),
            factor: 20.0,
        }
    );
}

#[test]
fn parses_scaled_average() {
    let ast = FormulaAst::parse("average(teamwork, adaptability) * 20").expect("valid formula");
    assert_eq!(
        ast,
        FormulaAst::Scaled {
            term: Box::new(FormulaAst::Average(vec![
                "teamwork".to_string(),
                "adaptability".to_string(),
            ])),
            factor: 20.0,
        }
    );
}

#[test]
fn parses_red_flag_aggregate() {
    let ast = FormulaAst::parse("from_red_flags(RF_A, RF_B)").expect("valid formula");
    assert_eq!(
        ast,
        FormulaAst::RedFlagSum(vec!["RF_A".to_string(), "RF_B".to_string()])
    );
}

#[test]
fn rejects_malformed_formulas() {
    for input in [
        "",
        "* 20",
        "communication +",
        "average(",
        "average()",
        "median(a, b)",
        "communication * ",
        "communication * 20 extra",
        "communication $ 2",
    ] {
        match FormulaAst::parse(input) {
            Err(FormulaError::Syntax(_)) => {}
            other => panic!("expected syntax error for '{input}', got {other:?}"),
        }
    }
}

#[test]
fn evaluates_rating_lookup_and_scale() {
    let ratings = ratings(&[("communication", 4)]);
    let active = BTreeSet::new();
    let flags = BTreeMap::new();
    let context = ScoringContext {
        ratings: &ratings,
        active_flags: &active,
        red_flags: &flags,
        target_score: "communication_score",
    };

    let ast = FormulaAst::parse("communication * 20").expect("valid formula");
    assert_eq!(ast.evaluate(&context).expect("evaluates"), 80.0);
}

#[test]
fn evaluates_average_before_scaling() {
    let ratings = ratings(&[("teamwork", 5), ("adaptability", 4)]);
    let active = BTreeSet::new();
    let flags = BTreeMap::new();
    let context = ScoringContext {
        ratings: &ratings,
        active_flags: &active,
        red_flags: &flags,
        target_score: "team_fit_score",
    };

    let ast = FormulaAst::parse("average(teamwork, adaptability) * 20").expect("valid formula");
    assert_eq!(ast.evaluate(&context).expect("evaluates"), 90.0);
}

#[test]
fn missing_rating_is_unknown_identifier() {
    let ratings = ratings(&[]);
    let active = BTreeSet::new();
    let flags = BTreeMap::new();
    let context = ScoringContext {
        ratings: &ratings,
        active_flags: &active,
        red_flags: &flags,
        target_score: "communication_score",
    };

    let ast = FormulaAst::parse("communication * 20").expect("valid formula");
    match ast.evaluate(&context) {
        Err(FormulaError::UnknownIdentifier(code)) => assert_eq!(code, "communication"),
        other => panic!("expected unknown identifier, got {other:?}"),
    }
}

#[test]
fn red_flag_sum_counts_only_active_flags() {
    let ratings = ratings(&[]);
    let mut flags = BTreeMap::new();
    flags.insert(
        "RF_A".to_string(),
        flag("RF_A", &[("team_risk", 30), ("other_score", -10)]),
    );
    flags.insert("RF_B".to_string(), flag("RF_B", &[("team_risk", 80)]));
    let active = BTreeSet::from(["RF_A".to_string()]);
    let context = ScoringContext {
        ratings: &ratings,
        active_flags: &active,
        red_flags: &flags,
        target_score: "team_risk",
    };

    let ast = FormulaAst::parse("from_red_flags(RF_A, RF_B)").expect("valid formula");
    assert_eq!(ast.evaluate(&context).expect("evaluates"), 30.0);
}

#[test]
fn red_flag_sum_uses_absolute_magnitudes_and_total_cap() {
    let ratings = ratings(&[]);
    let mut flags = BTreeMap::new();
    flags.insert("RF_A".to_string(), flag("RF_A", &[("team_risk", -45)]));
    flags.insert("RF_B".to_string(), flag("RF_B", &[("team_risk", 80)]));
    let active = BTreeSet::from(["RF_A".to_string(), "RF_B".to_string()]);
    let context = ScoringContext {
        ratings: &ratings,
        active_flags: &active,
        red_flags: &flags,
        target_score: "team_risk",
    };

    let ast = FormulaAst::parse("from_red_flags(RF_A, RF_B)").expect("valid formula");
    assert_eq!(ast.evaluate(&context).expect("evaluates"), 100.0);
}

#[test]
fn red_flag_without_matching_target_contributes_zero() {
    let ratings = ratings(&[]);
    let mut flags = BTreeMap::new();
    flags.insert("RF_A".to_string(), flag("RF_A", &[("other_risk", 40)]));
    let active = BTreeSet::from(["RF_A".to_string()]);
    let context = ScoringContext {
        ratings: &ratings,
        active_flags: &active,
        red_flags: &flags,
        target_score: "team_risk",
    };

    let ast = FormulaAst::parse("from_red_flags(RF_A)").expect("valid formula");
    assert_eq!(ast.evaluate(&context).expect("evaluates"), 0.0);
}

#[test]
fn evaluation_is_deterministic() {
    let ratings = ratings(&[("teamwork", 3), ("adaptability", 5)]);
    let active = BTreeSet::new();
    let flags = BTreeMap::new();
    let context = ScoringContext {
        ratings: &ratings,
        active_flags: &active,
        red_flags: &flags,
        target_score: "team_fit_score",
    };

    let ast = FormulaAst::parse("average(teamwork, adaptability) * 20").expect("valid formula");
    let first = ast.evaluate(&context).expect("evaluates");
    let second = ast.evaluate(&context).expect("evaluates");
    assert_eq!(first, second);
}
