//! Subcommand implementations and the state they share.

pub mod evaluate;
pub mod init;
pub mod keys;
pub mod notifications;
pub mod results;
pub mod stats;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use evalify_core::engine::EvalEngine;
use evalify_core::notifications::{LogObserver, NotificationLog};
use evalify_core::parser::{parse_exam, ExamDefinition};
use evalify_core::registry::AnswerKeyRegistry;
use evalify_core::results::ResultStore;
use evalify_core::store::{FileStore, KvStore};
use evalify_core::traits::Recognizer;
use evalify_providers::config::load_config_from;
use evalify_providers::{create_recognizer, EvalifyConfig};

/// Loaded configuration plus the store it points at.
pub struct Context {
    pub config: EvalifyConfig,
    exam_path: PathBuf,
    store: Arc<dyn KvStore>,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>, exam_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        let exam_path = exam_path.unwrap_or_else(|| config.exam_file.clone());
        let store: Arc<dyn KvStore> = Arc::new(FileStore::new(&config.data_dir));
        tracing::debug!(
            data_dir = %config.data_dir.display(),
            exam = %exam_path.display(),
            "loaded context"
        );
        Ok(Self {
            config,
            exam_path,
            store,
        })
    }

    pub fn exam_path(&self) -> &Path {
        &self.exam_path
    }

    pub fn exam(&self) -> Result<ExamDefinition> {
        anyhow::ensure!(
            self.exam_path.exists(),
            "exam definition not found: {} (run `evalify init` or pass --exam)",
            self.exam_path.display()
        );
        parse_exam(&self.exam_path)
    }

    pub fn results(&self) -> ResultStore {
        ResultStore::new(Arc::clone(&self.store))
    }

    pub fn notifications(&self) -> NotificationLog {
        NotificationLog::new(Arc::clone(&self.store), self.config.notification_cap)
    }

    /// An engine over the stored state, without a recognizer attached.
    pub fn engine(&self, exam: ExamDefinition) -> EvalEngine {
        EvalEngine::new(
            Arc::new(AnswerKeyRegistry::new(
                exam.builtin_keys,
                exam.layout.question_count,
                Arc::clone(&self.store),
            )),
            Arc::new(self.results()),
            Arc::new(self.notifications()),
            exam.layout,
            self.config.engine_config(),
        )
    }

    pub fn recognizer(&self, name: Option<&str>) -> Result<Arc<dyn Recognizer>> {
        let (name, recognizer_config) = self.config.recognizer(name)?;
        let recognizer = create_recognizer(name, recognizer_config, self.config.timeout_secs)
            .with_context(|| format!("failed to create recognizer '{name}'"))?;
        Ok(Arc::from(recognizer))
    }
}

/// Tracks notification log changes made during one command.
#[derive(Default)]
pub struct UnreadBadge {
    changed: AtomicBool,
    unread: AtomicBool,
}

impl LogObserver for UnreadBadge {
    fn on_log_changed(&self, has_unread: bool) {
        self.changed.store(true, Ordering::Relaxed);
        self.unread.store(has_unread, Ordering::Relaxed);
    }
}

impl UnreadBadge {
    /// Print a hint if this command left unread notifications behind.
    pub fn report(&self, log: &NotificationLog) {
        if self.changed.load(Ordering::Relaxed) && self.unread.load(Ordering::Relaxed) {
            eprintln!(
                "{} unread notification(s); run `evalify notifications list`",
                log.unread_count()
            );
        }
    }
}
