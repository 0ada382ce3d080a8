//! TOML exam-definition parser.
//!
//! An exam definition supplies everything the core treats as external
//! configuration: the question count, the subject ranges, and the built-in
//! answer keys.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{default_question_count, AnswerKey, ExamLayout, SubjectRange};

/// A parsed exam definition.
#[derive(Debug, Clone)]
pub struct ExamDefinition {
    /// Human-readable exam name.
    pub name: String,
    pub layout: ExamLayout,
    /// Built-in answer keys, keyed by name.
    pub builtin_keys: BTreeMap<String, AnswerKey>,
}

/// Intermediate TOML structure for exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    #[serde(default)]
    exam: TomlExamHeader,
    #[serde(default)]
    subjects: Vec<TomlSubject>,
    #[serde(default)]
    answer_keys: Vec<TomlAnswerKey>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    #[serde(default = "default_exam_name")]
    name: String,
    #[serde(default = "default_question_count")]
    question_count: u32,
}

impl Default for TomlExamHeader {
    fn default() -> Self {
        Self {
            name: default_exam_name(),
            question_count: default_question_count(),
        }
    }
}

fn default_exam_name() -> String {
    "Untitled exam".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlSubject {
    name: String,
    start: u32,
    end: u32,
}

#[derive(Debug, Deserialize)]
struct TomlAnswerKey {
    name: String,
    answers: String,
}

/// Parse a single TOML exam file.
pub fn parse_exam(path: &Path) -> Result<ExamDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an `ExamDefinition` (useful for testing).
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamDefinition> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let question_count = parsed.exam.question_count;
    anyhow::ensure!(question_count >= 1, "question_count must be at least 1");

    let mut subject_names = HashSet::new();
    let subjects = parsed
        .subjects
        .into_iter()
        .map(|s| {
            anyhow::ensure!(!s.name.trim().is_empty(), "subject name must not be empty");
            anyhow::ensure!(
                subject_names.insert(s.name.clone()),
                "duplicate subject: {}",
                s.name
            );
            anyhow::ensure!(
                s.start >= 1 && s.start <= s.end && s.end <= question_count,
                "subject '{}' range [{}, {}] must lie within 1..={question_count} with start <= end",
                s.name,
                s.start,
                s.end
            );
            Ok(SubjectRange {
                name: s.name,
                start: s.start,
                end: s.end,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut builtin_keys = BTreeMap::new();
    for k in parsed.answer_keys {
        anyhow::ensure!(
            !k.name.trim().is_empty(),
            "answer key name must not be empty"
        );
        let key = AnswerKey::from_compact(&k.answers)
            .map_err(|e| anyhow::anyhow!("answer key '{}': {e}", k.name))?;
        if let Some(max) = key.max_question() {
            anyhow::ensure!(
                max <= question_count,
                "answer key '{}' has answers past question {question_count}",
                k.name
            );
        }
        anyhow::ensure!(
            builtin_keys.insert(k.name.clone(), key).is_none(),
            "duplicate answer key: {}",
            k.name
        );
    }

    Ok(ExamDefinition {
        name: parsed.exam.name,
        layout: ExamLayout {
            question_count,
            subjects,
        },
        builtin_keys,
    })
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The subject or answer key the warning is about, if any.
    pub scope: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate an exam definition for issues that are legal but suspicious.
pub fn validate_exam(exam: &ExamDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let layout = &exam.layout;

    if layout.subjects.is_empty() {
        warnings.push(ValidationWarning {
            scope: None,
            message: "no subjects defined; every sheet will score 0".into(),
        });
    }

    // Overlapping ranges count the same question towards two subjects
    for (i, a) in layout.subjects.iter().enumerate() {
        for b in &layout.subjects[i + 1..] {
            if a.start <= b.end && b.start <= a.end {
                warnings.push(ValidationWarning {
                    scope: Some(a.name.clone()),
                    message: format!("range overlaps subject '{}'", b.name),
                });
            }
        }
    }

    let uncovered: Vec<u32> = (1..=layout.question_count)
        .filter(|q| !layout.is_covered(*q))
        .collect();
    if !uncovered.is_empty() && !layout.subjects.is_empty() {
        warnings.push(ValidationWarning {
            scope: None,
            message: format!(
                "{} question(s) belong to no subject and will not be scored (first: {})",
                uncovered.len(),
                uncovered[0]
            ),
        });
    }

    if exam.builtin_keys.is_empty() {
        warnings.push(ValidationWarning {
            scope: None,
            message: "no built-in answer keys defined".into(),
        });
    }

    for (name, key) in &exam.builtin_keys {
        let missing = (1..=layout.question_count)
            .filter(|q| layout.is_covered(*q) && key.get(*q).is_blank())
            .count();
        if missing > 0 {
            warnings.push(ValidationWarning {
                scope: Some(name.clone()),
                message: format!("{missing} scored question(s) have no answer and can never be correct"),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerOption;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[exam]
name = "Weekly Test"
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
answers = "ABCDA AAAAA"

[[answer_keys]]
name = "Set B"
answers = "EEEEE DDDDD"
"#;

    #[test]
    fn parse_valid_toml() {
        let exam = parse_exam_str(VALID_TOML, &PathBuf::from("exam.toml")).unwrap();
        assert_eq!(exam.name, "Weekly Test");
        assert_eq!(exam.layout.question_count, 10);
        assert_eq!(exam.layout.subjects.len(), 2);
        assert_eq!(exam.layout.subjects[1].name, "Science");
        assert_eq!(exam.builtin_keys.len(), 2);
        assert_eq!(exam.builtin_keys["Set A"].get(3), AnswerOption::C);
        assert!(validate_exam(&exam).is_empty());
    }

    #[test]
    fn parse_defaults() {
        let exam = parse_exam_str("", &PathBuf::from("exam.toml")).unwrap();
        assert_eq!(exam.layout.question_count, 100);
        assert!(exam.layout.subjects.is_empty());
        let warnings = validate_exam(&exam);
        assert!(warnings.iter().any(|w| w.message.contains("no subjects")));
    }

    #[test]
    fn reject_range_outside_question_count() {
        let toml = r#"
[exam]
question_count = 10

[[subjects]]
name = "Math"
start = 5
end = 11
"#;
        let err = parse_exam_str(toml, &PathBuf::from("exam.toml")).unwrap_err();
        assert!(err.to_string().contains("Math"));
    }

    #[test]
    fn reject_inverted_range() {
        let toml = r#"
[[subjects]]
name = "Math"
start = 9
end = 3
"#;
        assert!(parse_exam_str(toml, &PathBuf::from("exam.toml")).is_err());
    }

    #[test]
    fn reject_bad_answer_character() {
        let toml = r#"
[[answer_keys]]
name = "Set A"
answers = "ABXD"
"#;
        let err = parse_exam_str(toml, &PathBuf::from("exam.toml")).unwrap_err();
        assert!(err.to_string().contains("Set A"));
    }

    #[test]
    fn reject_key_longer_than_sheet() {
        let toml = r#"
[exam]
question_count = 3

[[answer_keys]]
name = "Too long"
answers = "ABCD"
"#;
        assert!(parse_exam_str(toml, &PathBuf::from("exam.toml")).is_err());
    }

    #[test]
    fn reject_duplicate_key_names() {
        let toml = r#"
[[answer_keys]]
name = "Set A"
answers = "A"

[[answer_keys]]
name = "Set A"
answers = "B"
"#;
        let err = parse_exam_str(toml, &PathBuf::from("exam.toml")).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn validate_overlap_and_gaps() {
        let toml = r#"
[exam]
question_count = 12

[[subjects]]
name = "Math"
start = 1
end = 6

[[subjects]]
name = "Science"
start = 5
end = 10

[[answer_keys]]
name = "Set A"
answers = "AAAAAAAAAA"
"#;
        let exam = parse_exam_str(toml, &PathBuf::from("exam.toml")).unwrap();
        let warnings = validate_exam(&exam);
        assert!(warnings.iter().any(|w| w.message.contains("overlaps")));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("2 question(s) belong to no subject")));
    }

    #[test]
    fn validate_incomplete_key() {
        let toml = r#"
[exam]
question_count = 4

[[subjects]]
name = "Math"
start = 1
end = 4

[[answer_keys]]
name = "Partial"
answers = "AB--"
"#;
        let exam = parse_exam_str(toml, &PathBuf::from("exam.toml")).unwrap();
        let warnings = validate_exam(&exam);
        assert!(warnings
            .iter()
            .any(|w| w.scope.as_deref() == Some("Partial") && w.message.starts_with("2 ")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_exam_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn parse_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exam.toml");
        std::fs::write(&path, VALID_TOML).unwrap();
        let exam = parse_exam(&path).unwrap();
        assert_eq!(exam.builtin_keys.len(), 2);
    }
}
