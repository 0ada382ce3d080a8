//! Mock recognizer for testing.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use evalify_core::error::RecognitionError;
use evalify_core::model::{AnswerKey, DetectedAnswers, SheetImage};
use evalify_core::traits::{parse_detected_answers, Recognizer};

/// A mock recognizer for exercising the pipeline without a vision service.
///
/// Answers are given in compact notation (`"ABCD-E"`, `-` for blank) and
/// selected by file-name substring. Output goes through the same response
/// parser as the real backends, so it always covers every question.
pub struct MockRecognizer {
    /// File-name substring → compact answers.
    sheets: BTreeMap<String, String>,
    /// Answers for sheets matching no entry in `sheets`.
    default_answers: String,
    /// Errors returned, in order, before any answers.
    failures: Mutex<VecDeque<RecognitionError>>,
    /// When set, every call fails with this schema violation.
    always_fail: Option<String>,
    call_count: AtomicU32,
    last_file: Mutex<Option<String>>,
}

impl MockRecognizer {
    pub fn new(sheets: BTreeMap<String, String>, default_answers: &str) -> Self {
        Self {
            sheets,
            default_answers: default_answers.to_string(),
            failures: Mutex::new(VecDeque::new()),
            always_fail: None,
            call_count: AtomicU32::new(0),
            last_file: Mutex::new(None),
        }
    }

    /// A mock that reports the same markings for every sheet.
    pub fn with_fixed_answers(answers: &str) -> Self {
        Self::new(BTreeMap::new(), answers)
    }

    /// A mock whose every call fails.
    pub fn failing(message: &str) -> Self {
        let mut mock = Self::new(BTreeMap::new(), "");
        mock.always_fail = Some(message.to_string());
        mock
    }

    /// Queue errors to return before the configured answers.
    pub fn with_failures(self, failures: Vec<RecognitionError>) -> Self {
        *self.failures.lock().unwrap() = failures.into();
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// File name of the last sheet seen.
    pub fn last_file(&self) -> Option<String> {
        self.last_file.lock().unwrap().clone()
    }

    fn answers_for(&self, file_name: &str) -> &str {
        self.sheets
            .iter()
            .find(|(pattern, _)| file_name.contains(pattern.as_str()))
            .map(|(_, answers)| answers.as_str())
            .unwrap_or(&self.default_answers)
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(
        &self,
        image: &SheetImage,
        question_count: u32,
    ) -> Result<DetectedAnswers, RecognitionError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_file.lock().unwrap() = Some(image.file_name.clone());

        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if let Some(message) = &self.always_fail {
            return Err(RecognitionError::SchemaViolation(message.clone()));
        }

        let key = AnswerKey::from_compact(self.answers_for(&image.file_name))
            .map_err(RecognitionError::MalformedResponse)?;

        // Render the wire document a real backend would return
        let answers: Map<String, Value> = (1..=question_count)
            .map(|q| (q.to_string(), json!(key.get(q).as_str())))
            .collect();
        let document = json!({ "answers": answers }).to_string();

        parse_detected_answers(&document, question_count)
    }
}
