//! Summary statistics over stored evaluation results.
//!
//! Everything here is derived and read-only; percentages are computed from
//! the stored integer scores and never written back.

use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

use crate::model::{EvaluationResult, ExamLayout};

/// Number of buckets in the score distribution.
pub const DISTRIBUTION_BUCKETS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub evaluation_count: usize,
    /// Mean total score, 0 when there are no results.
    pub average_score: f64,
    pub subjects: Vec<SubjectSummary>,
    pub distribution: Vec<ScoreBucket>,
    /// Total scores in chronological order.
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub subject: String,
    /// Range size of the subject.
    pub total_questions: u32,
    /// Mean subject score per evaluation.
    pub average_score: f64,
    /// Sum of scores over the sum of possible marks, as a percentage.
    pub performance_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub label: String,
    /// Inclusive bounds on the total score.
    pub low: u32,
    pub high: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub evaluation_date: DateTime<Utc>,
    pub total_score: u32,
}

/// Bucket bounds for a sheet of `question_count` questions.
///
/// The first bucket is `0..=w`, later ones `(k-1)w+1..=kw`, with the last
/// bucket absorbing any rounding so it always ends at `question_count`. For
/// 100 questions this gives `0-10`, `11-20`, ..., `91-100`.
pub fn bucket_bounds(question_count: u32) -> Vec<(u32, u32)> {
    let width = question_count.div_ceil(DISTRIBUTION_BUCKETS).max(1);
    let mut bounds = Vec::new();
    let mut low = 0;
    for k in 1..=DISTRIBUTION_BUCKETS {
        if low > question_count {
            break;
        }
        let high = if k == DISTRIBUTION_BUCKETS {
            question_count
        } else {
            (k * width).min(question_count)
        };
        bounds.push((low, high));
        low = high + 1;
    }
    bounds
}

/// Summarize `results` against the subjects of `layout`.
pub fn summarize(results: &[EvaluationResult], layout: &ExamLayout) -> ResultSummary {
    let n = results.len();

    let average_score = if n == 0 {
        0.0
    } else {
        results.iter().map(|r| r.total_score as f64).sum::<f64>() / n as f64
    };

    let subjects = layout
        .subjects
        .iter()
        .map(|subject| {
            let sum: u32 = results
                .iter()
                .filter_map(|r| r.subject_scores.get(&subject.name))
                .map(|s| s.score)
                .sum();
            let possible = n as f64 * subject.len() as f64;
            SubjectSummary {
                subject: subject.name.clone(),
                total_questions: subject.len(),
                average_score: if n == 0 { 0.0 } else { sum as f64 / n as f64 },
                performance_pct: if possible > 0.0 {
                    sum as f64 / possible * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    let distribution = bucket_bounds(layout.question_count)
        .into_iter()
        .map(|(low, high)| ScoreBucket {
            label: format!("{low}-{high}"),
            low,
            high,
            count: results
                .iter()
                .filter(|r| (low..=high).contains(&r.total_score))
                .count(),
        })
        .collect();

    let mut trend: Vec<TrendPoint> = results
        .iter()
        .map(|r| TrendPoint {
            evaluation_date: r.evaluation_date,
            total_score: r.total_score,
        })
        .collect();
    trend.sort_by_key(|p| p.evaluation_date);

    ResultSummary {
        evaluation_count: n,
        average_score,
        subjects,
        distribution,
        trend,
    }
}
