//! Evaluation pipeline orchestrator.
//!
//! Coordinates one request at a time: validate the request, recognize the
//! sheet (retrying transient failures), score it against the chosen key,
//! persist the result, and record a notification. Nothing is written unless
//! every earlier step succeeded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::error::{EvalError, RecognitionError, Result};
use crate::model::{
    AnswerKey, DetectedAnswers, EvaluationResult, ExamLayout, NotificationKind, SheetImage,
};
use crate::notifications::NotificationLog;
use crate::registry::AnswerKeyRegistry;
use crate::results::ResultStore;
use crate::scoring;
use crate::traits::Recognizer;

/// Configuration for the evaluation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retries on transient recognition errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each attempt.
    pub retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// One sheet to evaluate.
#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub image: SheetImage,
    /// Name of the answer key to grade against.
    pub answer_key: String,
    /// Optional human label for the evaluation.
    pub evaluation_name: Option<String>,
}

/// The evaluation engine.
pub struct EvalEngine {
    recognizer: Option<Arc<dyn Recognizer>>,
    registry: Arc<AnswerKeyRegistry>,
    results: Arc<ResultStore>,
    notifications: Arc<NotificationLog>,
    layout: ExamLayout,
    config: EngineConfig,
}

impl EvalEngine {
    /// An engine without a recognizer can still manage answer keys; any
    /// call that needs recognition fails validation.
    pub fn new(
        registry: Arc<AnswerKeyRegistry>,
        results: Arc<ResultStore>,
        notifications: Arc<NotificationLog>,
        layout: ExamLayout,
        config: EngineConfig,
    ) -> Self {
        Self {
            recognizer: None,
            registry,
            results,
            notifications,
            layout,
            config,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    fn recognizer(&self) -> Result<&dyn Recognizer> {
        self.recognizer
            .as_deref()
            .ok_or_else(|| EvalError::Validation("no recognizer configured".into()))
    }

    pub fn layout(&self) -> &ExamLayout {
        &self.layout
    }

    pub fn registry(&self) -> &AnswerKeyRegistry {
        &self.registry
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    /// Check a request without recognizing anything and return the key it
    /// selects.
    pub fn check_request(&self, request: &EvaluateRequest) -> Result<AnswerKey> {
        if request.image.is_empty() {
            return Err(EvalError::Validation("no image selected".into()));
        }
        if request.answer_key.trim().is_empty() {
            return Err(EvalError::Validation("no answer key selected".into()));
        }
        self.registry
            .get(&request.answer_key)
            .ok_or_else(|| EvalError::AnswerKeyNotFound(request.answer_key.clone()))
    }

    /// Evaluate one sheet and persist the outcome.
    pub async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluationResult> {
        let key = self.check_request(&request)?;
        let recognizer = self.recognizer()?;

        let start = Instant::now();
        let detected = recognize_with_retry(
            recognizer,
            &request.image,
            self.layout.question_count,
            &self.config,
        )
        .await
        .map_err(|e| {
            tracing::error!(
                "recognition failed for '{}': {e}",
                request.image.file_name
            );
            e
        })?;

        let result = scoring::score(&detected, &key, &self.layout).into_result(
            detected,
            request.image.file_name.clone(),
            request.answer_key.clone(),
            request.evaluation_name,
            Utc::now(),
        );

        self.results.append(result.clone())?;
        tracing::info!(
            file = %result.image_file_name,
            key = %result.answer_key_name,
            "evaluated sheet: {}/{} in {}ms",
            result.total_score,
            self.layout.question_count,
            start.elapsed().as_millis()
        );

        self.record(
            NotificationKind::Success,
            format!("Evaluation for '{}' is complete.", result.image_file_name),
        );

        Ok(result)
    }

    /// Register a key typed in by hand.
    pub fn create_key_manual(&self, name: &str, key: AnswerKey) -> Result<()> {
        self.registry.create(name, key)?;
        self.key_added(name);
        Ok(())
    }

    /// Register a key read from a correctly filled-in master sheet.
    pub async fn create_key_from_master(&self, name: &str, image: &SheetImage) -> Result<AnswerKey> {
        if name.trim().is_empty() {
            return Err(EvalError::Validation(
                "answer key name cannot be empty".into(),
            ));
        }
        if self.registry.is_builtin(name) {
            return Err(EvalError::Conflict(format!(
                "cannot overwrite built-in answer key: {name}"
            )));
        }
        if image.is_empty() {
            return Err(EvalError::Validation(
                "no master sheet image selected".into(),
            ));
        }

        let recognizer = self.recognizer()?;

        let detected =
            recognize_with_retry(recognizer, image, self.layout.question_count, &self.config)
                .await?;
        let key = detected.into_answer_key();
        self.registry.create(name, key.clone())?;
        self.key_added(name);
        Ok(key)
    }

    fn key_added(&self, name: &str) {
        self.record(
            NotificationKind::Success,
            format!("New answer key '{name}' added."),
        );
    }

    // Notification failures are logged, not returned.
    fn record(&self, kind: NotificationKind, message: String) {
        if let Err(e) = self.notifications.record(kind, message) {
            tracing::warn!("failed to record notification: {e}");
        }
    }
}

/// Upper bound on any single wait between recognition attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Recognize with exponential backoff on transient errors.
async fn recognize_with_retry(
    recognizer: &dyn Recognizer,
    image: &SheetImage,
    question_count: u32,
    config: &EngineConfig,
) -> std::result::Result<DetectedAnswers, RecognitionError> {
    let mut retry_delay = config.retry_delay;
    let mut attempt = 0;

    loop {
        tracing::debug!(
            recognizer = recognizer.name(),
            attempt,
            "recognizing '{}'",
            image.file_name
        );
        match recognizer.recognize(image, question_count).await {
            Ok(detected) => return Ok(detected),
            Err(e) if e.is_permanent() || attempt >= config.max_retries => {
                return Err(e);
            }
            Err(e) => {
                // Use the service's retry-after hint if available
                if let Some(ms) = e.retry_after_ms() {
                    retry_delay = Duration::from_millis(ms);
                }
                retry_delay = retry_delay.min(MAX_RETRY_DELAY);
                tracing::warn!(
                    "recognition attempt {} failed, retrying in {}ms: {e}",
                    attempt + 1,
                    retry_delay.as_millis()
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}
