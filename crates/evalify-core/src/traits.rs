//! The recognition seam and its shared wire contract.
//!
//! `Recognizer` is implemented by the `evalify-providers` crate. The prompt,
//! schema, and response parser live here so every backend asks for, and
//! accepts, exactly the same shape.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::RecognitionError;
use crate::model::{AnswerOption, DetectedAnswers, SheetImage};

// ---------------------------------------------------------------------------
// Recognizer trait
// ---------------------------------------------------------------------------

/// Turns a sheet image into per-question markings.
///
/// Implementations hold no evaluation state and never score. A response
/// that does not cover every question `1..=question_count` with a valid
/// option is an error, not a partial result.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Human-readable backend name (e.g. "gemini").
    fn name(&self) -> &str;

    async fn recognize(
        &self,
        image: &SheetImage,
        question_count: u32,
    ) -> Result<DetectedAnswers, RecognitionError>;
}

// ---------------------------------------------------------------------------
// Prompt and schema
// ---------------------------------------------------------------------------

/// Instruction text sent alongside the sheet image.
pub fn build_recognition_prompt(question_count: u32) -> String {
    format!(
        "You are an expert OMR (Optical Mark Recognition) sheet evaluation system. \
         Analyze the attached image of an OMR sheet and determine which bubble is marked for each question. \
         The sheet has {question_count} questions. \
         For each question from 1 to {question_count}, identify the marked option ('A', 'B', 'C', 'D', or 'E'). \
         If a question has no mark or multiple marks, consider it unanswered and return an empty string for it. \
         Respond ONLY with a single JSON object of the form {{\"answers\": {{\"1\": \"A\", \"2\": \"\", ...}}}} \
         containing every question number. Do not include any text before or after the JSON object."
    )
}

/// JSON schema (OpenAPI subset) describing the expected response.
pub fn build_response_schema(question_count: u32) -> Value {
    let mut properties = serde_json::Map::new();
    for q in 1..=question_count {
        properties.insert(
            q.to_string(),
            json!({
                "type": "STRING",
                "enum": ["A", "B", "C", "D", "E", ""],
                "description": format!(
                    "The marked answer for question {q}. Should be 'A', 'B', 'C', 'D', or 'E'. If unmarked or multiply marked, return an empty string."
                ),
            }),
        );
    }
    let required: Vec<String> = (1..=question_count).map(|q| q.to_string()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "answers": {
                "type": "OBJECT",
                "properties": properties,
                "required": required,
            }
        },
        "required": ["answers"],
    })
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Strip an optional markdown code fence around a JSON payload.
///
/// Handles ```json and bare ``` fences, including an unclosed trailing
/// fence from a truncated response. Text without a fence is returned
/// trimmed.
pub fn extract_json_payload(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_fence = &trimmed[start + 3..];
    // Skip the info string ("json", "JSON", ...) up to the end of the line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(after_fence.len());
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parse a recognizer's text output into `DetectedAnswers`.
///
/// The document must be an object with an `answers` object whose keys are
/// exactly the question numbers `1..=question_count` and whose values are
/// one of `"A"`..`"E"` or `""`. Nothing is coerced.
pub fn parse_detected_answers(
    text: &str,
    question_count: u32,
) -> Result<DetectedAnswers, RecognitionError> {
    let payload = extract_json_payload(text);
    let document: Value = serde_json::from_str(payload)
        .map_err(|e| RecognitionError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let answers = document
        .get("answers")
        .ok_or_else(|| RecognitionError::SchemaViolation("missing 'answers' object".into()))?
        .as_object()
        .ok_or_else(|| RecognitionError::SchemaViolation("'answers' is not an object".into()))?;

    let mut detected = BTreeMap::new();
    for (raw_q, raw_option) in answers {
        let q: u32 = raw_q.parse().map_err(|_| {
            RecognitionError::SchemaViolation(format!("question key {raw_q:?} is not a number"))
        })?;
        if q == 0 || q > question_count {
            return Err(RecognitionError::SchemaViolation(format!(
                "question {q} is outside 1..={question_count}"
            )));
        }
        let option: AnswerOption = raw_option
            .as_str()
            .ok_or_else(|| {
                RecognitionError::SchemaViolation(format!("question {q}: answer is not a string"))
            })?
            .parse()
            .map_err(|e: String| RecognitionError::SchemaViolation(format!("question {q}: {e}")))?;
        if detected.insert(q, option).is_some() {
            return Err(RecognitionError::SchemaViolation(format!(
                "question {q} appears more than once"
            )));
        }
    }

    if let Some(missing) = (1..=question_count).find(|q| !detected.contains_key(q)) {
        return Err(RecognitionError::SchemaViolation(format!(
            "no answer reported for question {missing}"
        )));
    }

    Ok(detected.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_response(question_count: u32, overrides: &[(u32, &str)]) -> String {
        let mut answers = serde_json::Map::new();
        for q in 1..=question_count {
            answers.insert(q.to_string(), json!("A"));
        }
        for (q, v) in overrides {
            answers.insert(q.to_string(), json!(v));
        }
        json!({ "answers": answers }).to_string()
    }

    #[test]
    fn parse_complete_response() {
        let text = full_response(5, &[(2, ""), (4, "E")]);
        let detected = parse_detected_answers(&text, 5).unwrap();
        assert_eq!(detected.len(), 5);
        assert_eq!(detected.get(2), AnswerOption::Blank);
        assert_eq!(detected.get(4), AnswerOption::E);
    }

    #[test]
    fn parse_fenced_response() {
        let text = format!("```json\n{}\n```", full_response(3, &[]));
        assert_eq!(parse_detected_answers(&text, 3).unwrap().len(), 3);
    }

    #[test]
    fn parse_truncated_fence() {
        let text = format!("```\n{}", full_response(2, &[]));
        assert!(parse_detected_answers(&text, 2).is_ok());
    }

    #[test]
    fn reject_unknown_option() {
        let text = full_response(3, &[(3, "X")]);
        let err = parse_detected_answers(&text, 3).unwrap_err();
        assert!(matches!(err, RecognitionError::SchemaViolation(_)));
        assert!(err.to_string().contains("question 3"));
    }

    #[test]
    fn reject_lowercase_option() {
        let text = full_response(3, &[(1, "b")]);
        assert!(parse_detected_answers(&text, 3).is_err());
    }

    #[test]
    fn reject_missing_question() {
        let text = json!({"answers": {"1": "A", "3": "B"}}).to_string();
        let err = parse_detected_answers(&text, 3).unwrap_err();
        assert!(err.to_string().contains("question 2"));
    }

    #[test]
    fn reject_out_of_range_question() {
        let text = full_response(3, &[(4, "A")]);
        assert!(parse_detected_answers(&text, 3).is_err());
    }

    #[test]
    fn reject_non_numeric_key() {
        let text = json!({"answers": {"1": "A", "two": "B"}}).to_string();
        assert!(parse_detected_answers(&text, 1).is_err());
    }

    #[test]
    fn reject_missing_answers_object() {
        let err = parse_detected_answers(r#"{"result": {}}"#, 1).unwrap_err();
        assert!(matches!(err, RecognitionError::SchemaViolation(_)));
    }

    #[test]
    fn reject_non_json() {
        let err = parse_detected_answers("I could not read the sheet.", 1).unwrap_err();
        assert!(matches!(err, RecognitionError::MalformedResponse(_)));
    }

    #[test]
    fn reject_numeric_answer() {
        let text = json!({"answers": {"1": 1}}).to_string();
        assert!(parse_detected_answers(&text, 1).is_err());
    }

    #[test]
    fn schema_requires_every_question() {
        let schema = build_response_schema(4);
        let required = schema["properties"]["answers"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
        assert_eq!(schema["required"], json!(["answers"]));
        assert!(schema["properties"]["answers"]["properties"]["4"].is_object());
    }

    #[test]
    fn prompt_mentions_question_count() {
        let prompt = build_recognition_prompt(60);
        assert!(prompt.contains("60 questions"));
        assert!(prompt.contains("empty string"));
    }

    #[test]
    fn extract_plain_payload() {
        assert_eq!(extract_json_payload("  {\"a\":1}\n"), "{\"a\":1}");
    }
}
