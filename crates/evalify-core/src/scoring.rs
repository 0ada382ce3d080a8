//! Scoring engine: compares detected answers against an answer key.
//!
//! A question is correct only when the sheet shows a non-blank option that
//! exactly equals the key's option. There is no partial credit and no
//! negative marking. Questions outside every subject range are ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerKey, DetectedAnswers, EvaluationResult, ExamLayout, SubjectScoreEntry};

/// The score fields of an evaluation, before identity is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    /// Sum of every subject's score.
    pub total_score: u32,
    pub subject_scores: BTreeMap<String, SubjectScoreEntry>,
}

/// Whether question `q` on the sheet earns its mark.
pub fn is_correct(detected: &DetectedAnswers, key: &AnswerKey, q: u32) -> bool {
    let marked = detected.get(q);
    !marked.is_blank() && marked == key.get(q)
}

/// Score a sheet subject by subject.
pub fn score(detected: &DetectedAnswers, key: &AnswerKey, layout: &ExamLayout) -> ScoreSheet {
    let mut subject_scores = BTreeMap::new();

    for subject in &layout.subjects {
        let correct = subject
            .questions()
            .filter(|q| is_correct(detected, key, *q))
            .count() as u32;
        subject_scores.insert(
            subject.name.clone(),
            SubjectScoreEntry {
                score: correct,
                total: subject.len(),
            },
        );
    }

    // The total is derived from the subject tallies, never recounted.
    let total_score = subject_scores.values().map(|s| s.score).sum();

    ScoreSheet {
        total_score,
        subject_scores,
    }
}

impl ScoreSheet {
    /// Stamp identity, labels, and the evaluation time onto the scores.
    pub fn into_result(
        self,
        detected_answers: DetectedAnswers,
        image_file_name: impl Into<String>,
        answer_key_name: impl Into<String>,
        evaluation_name: Option<String>,
        evaluation_date: DateTime<Utc>,
    ) -> EvaluationResult {
        EvaluationResult {
            id: Uuid::new_v4(),
            evaluation_name: evaluation_name.filter(|n| !n.trim().is_empty()),
            image_file_name: image_file_name.into(),
            evaluation_date,
            total_score: self.total_score,
            subject_scores: self.subject_scores,
            detected_answers,
            answer_key_name: answer_key_name.into(),
        }
    }
}
