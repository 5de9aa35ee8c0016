use std::sync::Arc;

use chrono::NaiveDate;

use crate::workflows::interview::domain::{
    CompetencyRating, InterviewId, InterviewRecord, RedFlag, TranscriptAnswer,
};
use crate::workflows::interview::evaluation::detection::{
    ExtractedFact, FactExtractor, PatternClassifier,
};
use crate::workflows::interview::{EngineConfig, EngineSnapshot, EvaluationEngine};

pub(super) const DIMENSIONS: [&str; 8] = [
    "communication",
    "accountability",
    "teamwork",
    "stress_resilience",
    "adaptability",
    "learning_agility",
    "integrity",
    "role_competence",
];

pub(super) fn snapshot() -> Arc<EngineSnapshot> {
    Arc::new(EngineSnapshot::load(EngineConfig::standard()).expect("standard rubric loads"))
}

pub(super) fn engine() -> EvaluationEngine {
    EvaluationEngine::new(snapshot())
}

pub(super) fn ratings(values: &[(&str, u8)]) -> Vec<CompetencyRating> {
    values
        .iter()
        .map(|(code, value)| CompetencyRating {
            dimension_code: code.to_string(),
            value: *value,
        })
        .collect()
}

/// Strong-candidate ratings used across the scenario suites.
pub(super) fn clean_ratings() -> Vec<CompetencyRating> {
    ratings(&[
        ("communication", 5),
        ("accountability", 5),
        ("teamwork", 5),
        ("stress_resilience", 4),
        ("adaptability", 4),
        ("learning_agility", 4),
        ("integrity", 5),
        ("role_competence", 4),
    ])
}

pub(super) fn flat_ratings(value: u8) -> Vec<CompetencyRating> {
    DIMENSIONS
        .iter()
        .map(|code| CompetencyRating {
            dimension_code: code.to_string(),
            value,
        })
        .collect()
}

pub(super) fn answer(id: &str, text: &str) -> TranscriptAnswer {
    TranscriptAnswer {
        answer_id: id.to_string(),
        text: text.to_string(),
    }
}

pub(super) fn neutral_transcript() -> Vec<TranscriptAnswer> {
    vec![
        answer("a1", "Takimla birlikte sprint hedeflerini planladik."),
        answer("a2", "Projeyi zamaninda teslim ettik."),
    ]
}

pub(super) fn interview(
    ratings: Vec<CompetencyRating>,
    transcript: Vec<TranscriptAnswer>,
) -> InterviewRecord {
    InterviewRecord {
        interview_id: InterviewId("int-0042".to_string()),
        conducted_on: NaiveDate::from_ymd_opt(2026, 3, 12).expect("valid date"),
        ratings,
        transcript,
    }
}

/// Fact extractor returning canned `(answer_id, key, value)` triples.
pub(super) struct CannedFacts {
    pub(super) facts: Vec<(&'static str, &'static str, &'static str)>,
}

impl FactExtractor for CannedFacts {
    fn extract_facts(&self, answer: &TranscriptAnswer) -> Vec<ExtractedFact> {
        self.facts
            .iter()
            .filter(|(answer_id, _, _)| *answer_id == answer.answer_id)
            .map(|(_, key, value)| ExtractedFact {
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect()
    }
}

/// Classifier flagging any answer containing a keyword, standing in for the
/// external NLU collaborator.
pub(super) struct KeywordClassifier {
    pub(super) keyword: &'static str,
    pub(super) confidence: f32,
}

impl PatternClassifier for KeywordClassifier {
    fn classify(&self, _flag: &RedFlag, answer: &TranscriptAnswer) -> Option<f32> {
        answer
            .text
            .to_lowercase()
            .contains(self.keyword)
            .then_some(self.confidence)
    }
}
