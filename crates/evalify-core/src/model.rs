//! Core data model types for evalify.
//!
//! These are the types every other module exchanges: answer options, the two
//! answer-map roles (authoritative keys vs. observed markings), the exam
//! layout, evaluation results, and notification events.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One marked bubble, or the blank sentinel for "unanswered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
    E,
    Blank,
}

impl AnswerOption {
    /// All markable options, in sheet order.
    pub const MARKED: [AnswerOption; 5] = [
        AnswerOption::A,
        AnswerOption::B,
        AnswerOption::C,
        AnswerOption::D,
        AnswerOption::E,
    ];

    pub fn is_blank(self) -> bool {
        self == AnswerOption::Blank
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
            AnswerOption::E => "E",
            AnswerOption::Blank => "",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            "D" => Ok(AnswerOption::D),
            "E" => Ok(AnswerOption::E),
            "" => Ok(AnswerOption::Blank),
            other => Err(format!("invalid answer option: {other:?}")),
        }
    }
}

impl TryFrom<String> for AnswerOption {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AnswerOption> for String {
    fn from(option: AnswerOption) -> Self {
        option.as_str().to_string()
    }
}

/// Characters accepted as "blank" in the compact key notation.
const COMPACT_BLANKS: [char; 3] = ['-', '.', '_'];

// `AnswerKey` and `DetectedAnswers` share a representation but not a role;
// keeping them as separate newtypes stops one from being passed as the other.
macro_rules! answer_map {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(BTreeMap<u32, AnswerOption>);

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// The option for question `q`; absent entries read as blank.
            pub fn get(&self, q: u32) -> AnswerOption {
                self.0.get(&q).copied().unwrap_or(AnswerOption::Blank)
            }

            pub fn insert(&mut self, q: u32, option: AnswerOption) {
                self.0.insert(q, option);
            }

            /// Number of explicit entries (blanks included).
            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Entries in ascending question order.
            pub fn iter(&self) -> impl Iterator<Item = (u32, AnswerOption)> + '_ {
                self.0.iter().map(|(q, o)| (*q, *o))
            }

            /// Highest question number present, if any.
            pub fn max_question(&self) -> Option<u32> {
                self.0.keys().next_back().copied()
            }

            /// Render questions `1..=question_count` as one character each,
            /// `-` for blank.
            pub fn to_compact(&self, question_count: u32) -> String {
                (1..=question_count)
                    .map(|q| match self.get(q) {
                        AnswerOption::Blank => '-',
                        other => other.as_str().chars().next().unwrap_or('-'),
                    })
                    .collect()
            }
        }

        impl FromIterator<(u32, AnswerOption)> for $name {
            fn from_iter<I: IntoIterator<Item = (u32, AnswerOption)>>(iter: I) -> Self {
                Self(iter.into_iter().collect())
            }
        }
    };
}

answer_map!(
    /// The authoritative question → option mapping used to grade a sheet.
    AnswerKey
);

answer_map!(
    /// The observed marking for one physical sheet, as produced by a
    /// recognizer.
    DetectedAnswers
);

impl AnswerKey {
    /// Parse the compact notation: one character per question starting at
    /// question 1, `A`-`E` for an answer and `-`, `.` or `_` for blank.
    /// Whitespace is ignored so long keys can be grouped. Blank positions
    /// are not stored.
    pub fn from_compact(s: &str) -> Result<Self, String> {
        let mut key = AnswerKey::new();
        let mut q = 0u32;
        for c in s.chars().filter(|c| !c.is_whitespace()) {
            q += 1;
            if COMPACT_BLANKS.contains(&c) {
                continue;
            }
            let option: AnswerOption = c
                .to_string()
                .parse()
                .map_err(|_| format!("question {q}: invalid answer character {c:?}"))?;
            key.insert(q, option);
        }
        Ok(key)
    }
}

impl DetectedAnswers {
    /// Reuse a recognized master sheet as an answer key. Blank detections
    /// are dropped, since a missing key entry already means "never correct".
    pub fn into_answer_key(self) -> AnswerKey {
        self.0
            .into_iter()
            .filter(|(_, option)| !option.is_blank())
            .collect()
    }
}

/// A named contiguous span of questions, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRange {
    pub name: String,
    pub start: u32,
    pub end: u32,
}

impl SubjectRange {
    /// Number of questions in the range.
    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, q: u32) -> bool {
        (self.start..=self.end).contains(&q)
    }

    pub fn questions(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// The externally configured shape of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamLayout {
    /// Total number of questions on the sheet (N).
    #[serde(default = "default_question_count")]
    pub question_count: u32,
    /// Subjects in presentation order.
    #[serde(default)]
    pub subjects: Vec<SubjectRange>,
}

pub fn default_question_count() -> u32 {
    100
}

impl ExamLayout {
    pub fn subject(&self, name: &str) -> Option<&SubjectRange> {
        self.subjects.iter().find(|s| s.name == name)
    }

    /// Whether any subject range covers question `q`.
    pub fn is_covered(&self, q: u32) -> bool {
        self.subjects.iter().any(|s| s.contains(q))
    }
}

/// Score for one subject. `total` is the range size, not the answered count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScoreEntry {
    pub score: u32,
    pub total: u32,
}

/// The durable record of one scoring run. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub id: Uuid,
    #[serde(default)]
    pub evaluation_name: Option<String>,
    pub image_file_name: String,
    pub evaluation_date: DateTime<Utc>,
    pub total_score: u32,
    pub subject_scores: BTreeMap<String, SubjectScoreEntry>,
    pub detected_answers: DetectedAnswers,
    pub answer_key_name: String,
}

/// Kind of a user-visible event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Info => write!(f, "info"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(NotificationKind::Success),
            "info" => Ok(NotificationKind::Info),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// A scanned sheet handed to a recognizer.
#[derive(Clone, PartialEq, Eq)]
pub struct SheetImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for SheetImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetImage")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl SheetImage {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, inferring the MIME type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            mime_type: mime_type_for(path).to_string(),
            file_name,
            bytes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// MIME type for a raster image path, by extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "image/jpeg",
    }
}
