//! End-to-end pipeline tests against a file-backed store.
//!
//! A fixed recognizer stands in for the vision backend so the full
//! validate → recognize → score → persist → notify path runs offline, and
//! the store is reopened to check what survives a restart.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evalify_core::engine::{EngineConfig, EvalEngine, EvaluateRequest};
use evalify_core::error::RecognitionError;
use evalify_core::model::{AnswerKey, DetectedAnswers, NotificationKind, SheetImage};
use evalify_core::notifications::{NotificationLog, DEFAULT_CAP};
use evalify_core::parser::{parse_exam_str, ExamDefinition};
use evalify_core::registry::AnswerKeyRegistry;
use evalify_core::results::ResultStore;
use evalify_core::statistics::summarize;
use evalify_core::store::{FileStore, KvStore};
use evalify_core::traits::Recognizer;

const EXAM: &str = r#"
[exam]
name = "Mock test"
question_count = 10

[[subjects]]
name = "Math"
start = 1
end = 5

[[subjects]]
name = "Science"
start = 6
end = 10

[[answer_keys]]
name = "Set A"
answers = "ABCDA BCDEA"
"#;

/// Always reports the same markings.
struct FixedRecognizer(DetectedAnswers);

#[async_trait]
impl Recognizer for FixedRecognizer {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn recognize(
        &self,
        _image: &SheetImage,
        _question_count: u32,
    ) -> Result<DetectedAnswers, RecognitionError> {
        Ok(self.0.clone())
    }
}

fn exam() -> ExamDefinition {
    parse_exam_str(EXAM, Path::new("exam.toml")).unwrap()
}

fn build_engine(data_dir: &Path, marked: &str) -> EvalEngine {
    let exam = exam();
    let store: Arc<dyn KvStore> = Arc::new(FileStore::new(data_dir));
    let detected = AnswerKey::from_compact(marked)
        .unwrap()
        .iter()
        .collect::<DetectedAnswers>();
    EvalEngine::new(
        Arc::new(AnswerKeyRegistry::new(
            exam.builtin_keys,
            exam.layout.question_count,
            Arc::clone(&store),
        )),
        Arc::new(ResultStore::new(Arc::clone(&store))),
        Arc::new(NotificationLog::new(store, DEFAULT_CAP)),
        exam.layout,
        EngineConfig {
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
        },
    )
    .with_recognizer(Arc::new(FixedRecognizer(detected)))
}

fn sheet(name: &str) -> SheetImage {
    SheetImage::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
}

#[tokio::test]
async fn evaluation_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = {
        let engine = build_engine(dir.path(), "ABCDA-CDEE");
        engine
            .evaluate(EvaluateRequest {
                image: sheet("roll-17.png"),
                answer_key: "Set A".into(),
                evaluation_name: Some("Weekly quiz".into()),
            })
            .await
            .unwrap()
    };
    assert_eq!(first.subject_scores["Math"].score, 5);
    assert_eq!(first.subject_scores["Science"].score, 3);
    assert_eq!(first.total_score, 8);

    let engine = build_engine(dir.path(), "ABCDABCDEA");
    assert_eq!(engine.results().list_all(), vec![first.clone()]);

    let second = engine
        .evaluate(EvaluateRequest {
            image: sheet("roll-18.png"),
            answer_key: "Set A".into(),
            evaluation_name: None,
        })
        .await
        .unwrap();
    assert_eq!(second.total_score, 10);

    let stored = engine.results().list_all();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, second.id);
    assert_eq!(stored[1].id, first.id);

    let events = engine.notifications().list_all();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message, "Evaluation for 'roll-18.png' is complete.");
    assert_eq!(events[1].message, "Evaluation for 'roll-17.png' is complete.");
    assert!(events.iter().all(|e| e.kind == NotificationKind::Success));
}

#[tokio::test]
async fn custom_key_is_usable_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let engine = build_engine(dir.path(), "EEEEEEEEEE");
        engine
            .create_key_manual("All E", AnswerKey::from_compact("EEEEEEEEEE").unwrap())
            .unwrap();
    }

    let engine = build_engine(dir.path(), "EEEEEEEEEE");
    assert!(engine.registry().list_all().contains_key("All E"));
    assert!(engine.registry().list_all().contains_key("Set A"));

    let result = engine
        .evaluate(EvaluateRequest {
            image: sheet("roll-19.png"),
            answer_key: "All E".into(),
            evaluation_name: None,
        })
        .await
        .unwrap();
    assert_eq!(result.total_score, 10);
    assert_eq!(result.answer_key_name, "All E");
}

#[tokio::test]
async fn summary_reflects_stored_results() {
    let dir = tempfile::tempdir().unwrap();
    let engine = build_engine(dir.path(), "ABCDA-----");

    for i in 0..3 {
        engine
            .evaluate(EvaluateRequest {
                image: sheet(&format!("roll-{i}.png")),
                answer_key: "Set A".into(),
                evaluation_name: None,
            })
            .await
            .unwrap();
    }

    let summary = summarize(&engine.results().list_all(), engine.layout());
    assert_eq!(summary.evaluation_count, 3);
    assert_eq!(summary.average_score, 5.0);
    assert_eq!(summary.subjects[0].performance_pct, 100.0);
    assert_eq!(summary.subjects[1].performance_pct, 0.0);
    assert_eq!(summary.trend.len(), 3);
}

#[tokio::test]
async fn corrupt_results_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("results.json"), "{ not json").unwrap();

    let engine = build_engine(dir.path(), "ABCDABCDEA");
    assert!(engine.results().is_empty());

    engine
        .evaluate(EvaluateRequest {
            image: sheet("roll-20.png"),
            answer_key: "Set A".into(),
            evaluation_name: None,
        })
        .await
        .unwrap();
    assert_eq!(engine.results().len(), 1);
}
