//! Red flag detection over transcript answers.
//!
//! The deterministic core implements `phrase_match` and `cross_reference`.
//! `pattern_analysis` flags describe qualitative heuristics and only fire when
//! an external [`PatternClassifier`] marks the answer; without one configured
//! they are inert. Fact extraction for cross-reference checks is likewise an
//! external concern consumed through the narrow [`FactExtractor`] interface;
//! the detector contributes only the disagreement check.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::super::domain::{DetectionMethod, RedFlag, RedFlagMatch, TranscriptAnswer};

const PHRASE_CONFIDENCE: f32 = 1.0;
const CROSS_REFERENCE_CONFIDENCE: f32 = 0.9;

/// A semantic fact pulled out of one answer, e.g. a stated tenure or headcount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub key: String,
    pub value: String,
}

/// External collaborator extracting comparable facts from an answer.
pub trait FactExtractor: Send + Sync {
    fn extract_facts(&self, answer: &TranscriptAnswer) -> Vec<ExtractedFact>;
}

/// External classifier consulted for `pattern_analysis` flags. Returns a
/// confidence when the answer exhibits the flag's behavioral patterns.
pub trait PatternClassifier: Send + Sync {
    fn classify(&self, flag: &RedFlag, answer: &TranscriptAnswer) -> Option<f32>;
}

/// Full detection result for one interview transcript.
#[derive(Debug, Clone, Default)]
pub(crate) struct DetectionReport {
    /// Matches sorted by `(flag_code, answer_id)` for deterministic
    /// downstream application.
    pub matches: Vec<RedFlagMatch>,
    pub has_auto_reject_trigger: bool,
}

impl DetectionReport {
    pub(crate) fn active_flag_codes(&self) -> BTreeSet<String> {
        self.matches
            .iter()
            .map(|record| record.flag_code.clone())
            .collect()
    }
}

/// Stateless scanner applying every configured flag to a transcript.
pub(crate) struct RedFlagDetector<'a> {
    flags: &'a BTreeMap<String, RedFlag>,
    fact_extractor: Option<&'a dyn FactExtractor>,
    pattern_classifier: Option<&'a dyn PatternClassifier>,
}

impl<'a> RedFlagDetector<'a> {
    pub(crate) fn new(
        flags: &'a BTreeMap<String, RedFlag>,
        fact_extractor: Option<&'a dyn FactExtractor>,
        pattern_classifier: Option<&'a dyn PatternClassifier>,
    ) -> Self {
        Self {
            flags,
            fact_extractor,
            pattern_classifier,
        }
    }

    pub(crate) fn detect(&self, transcript: &[TranscriptAnswer]) -> DetectionReport {
        let lowered: Vec<String> = transcript
            .iter()
            .map(|answer| answer.text.to_lowercase())
            .collect();
        let conflicts = self
            .fact_extractor
            .filter(|_| {
                self.flags
                    .values()
                    .any(|flag| flag.detection_method == DetectionMethod::CrossReference)
            })
            .map(|extractor| fact_conflicts(transcript, extractor))
            .unwrap_or_default();

        let mut matches = Vec::new();
        let mut has_auto_reject_trigger = false;

        for flag in self.flags.values() {
            let flag_matches = match flag.detection_method {
                DetectionMethod::PhraseMatch => phrase_matches(flag, transcript, &lowered),
                DetectionMethod::PatternAnalysis => match self.pattern_classifier {
                    Some(classifier) => pattern_matches(flag, transcript, classifier),
                    None => Vec::new(),
                },
                DetectionMethod::CrossReference => conflict_matches(flag, &conflicts),
            };

            if !flag_matches.is_empty() && flag.causes_auto_reject {
                has_auto_reject_trigger = true;
            }
            matches.extend(flag_matches);
        }

        matches.sort_by(|left, right| {
            (&left.flag_code, &left.answer_id).cmp(&(&right.flag_code, &right.answer_id))
        });

        debug!(
            matches = matches.len(),
            auto_reject = has_auto_reject_trigger,
            "red flag detection complete"
        );

        DetectionReport {
            matches,
            has_auto_reject_trigger,
        }
    }
}

/// One match per `(flag, answer)` pair: multiple phrase hits within the same
/// answer must not double-penalize verbose answers.
fn phrase_matches(
    flag: &RedFlag,
    transcript: &[TranscriptAnswer],
    lowered: &[String],
) -> Vec<RedFlagMatch> {
    let mut matches = Vec::new();

    for (answer, text) in transcript.iter().zip(lowered) {
        let hit = flag
            .trigger_phrases
            .iter()
            .find(|phrase| text.contains(&phrase.to_lowercase()));
        if let Some(phrase) = hit {
            matches.push(RedFlagMatch {
                flag_code: flag.code.clone(),
                answer_id: answer.answer_id.clone(),
                matched: phrase.clone(),
                severity: flag.severity,
                confidence: PHRASE_CONFIDENCE,
            });
        }
    }

    matches
}

fn pattern_matches(
    flag: &RedFlag,
    transcript: &[TranscriptAnswer],
    classifier: &dyn PatternClassifier,
) -> Vec<RedFlagMatch> {
    let mut matches = Vec::new();

    for answer in transcript {
        if let Some(confidence) = classifier.classify(flag, answer) {
            let matched = flag
                .behavioral_patterns
                .first()
                .cloned()
                .unwrap_or_else(|| "behavioral pattern".to_string());
            matches.push(RedFlagMatch {
                flag_code: flag.code.clone(),
                answer_id: answer.answer_id.clone(),
                matched,
                severity: flag.severity,
                confidence,
            });
        }
    }

    matches
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FactConflict {
    key: String,
    first_value: String,
    second_value: String,
    /// Answer that introduced the disagreeing value.
    answer_id: String,
}

/// Collect the first disagreement per fact key, attributed to the later answer.
fn fact_conflicts(transcript: &[TranscriptAnswer], extractor: &dyn FactExtractor) -> Vec<FactConflict> {
    let mut first_seen: BTreeMap<String, String> = BTreeMap::new();
    let mut conflicts = Vec::new();
    let mut conflicted: BTreeSet<String> = BTreeSet::new();

    for answer in transcript {
        for fact in extractor.extract_facts(answer) {
            if conflicted.contains(&fact.key) {
                continue;
            }
            match first_seen.get(&fact.key) {
                None => {
                    first_seen.insert(fact.key.clone(), fact.value);
                }
                Some(first_value) if *first_value != fact.value => {
                    conflicts.push(FactConflict {
                        key: fact.key.clone(),
                        first_value: first_value.clone(),
                        second_value: fact.value,
                        answer_id: answer.answer_id.clone(),
                    });
                    conflicted.insert(fact.key);
                }
                Some(_) => {}
            }
        }
    }

    conflicts
}

/// Idempotent per answer: several conflicting keys in the same answer still
/// count as one match for the flag.
fn conflict_matches(flag: &RedFlag, conflicts: &[FactConflict]) -> Vec<RedFlagMatch> {
    let mut matches = Vec::new();
    let mut seen_answers: BTreeSet<&str> = BTreeSet::new();

    for conflict in conflicts {
        if !seen_answers.insert(conflict.answer_id.as_str()) {
            continue;
        }
        matches.push(RedFlagMatch {
            flag_code: flag.code.clone(),
            answer_id: conflict.answer_id.clone(),
            matched: format!(
                "{}: '{}' != '{}'",
                conflict.key, conflict.first_value, conflict.second_value
            ),
            severity: flag.severity,
            confidence: CROSS_REFERENCE_CONFIDENCE,
        });
    }

    matches
}
