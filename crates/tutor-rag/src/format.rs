//! Turns raw generation output into a structured answer.
//!
//! Model output is untrusted: it may be clean JSON, JSON wrapped in prose, or
//! plain text. Each stage falls through to the next and the plain-text path
//! always produces something.

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use tutor_core::{Error, Result};

use crate::response::{BulletPoint, GeneralAnswer, MathAnswer, MathStep, ResponseBody};

pub const DEFAULT_GENERAL_CAPTION: &str = "Response";
pub const DEFAULT_MATH_CAPTION: &str = "Math Solution";
const CAPTION_MAX_CHARS: usize = 50;
const FALLBACK_STEP_CHARS: usize = 500;
const FALLBACK_BULLETS: usize = 4;

pub trait ResponseFormatter: Send + Sync {
    fn format(&self, raw: &str, question: &str, subject: &str, is_computational: bool) -> ResponseBody;
}

pub struct OutputFormatter {
    json_block: Regex,
    sentence_end: Regex,
    step_marker: Regex,
    final_answer: Regex,
    caption_prefix: Regex,
}

fn compile(pattern: &str) -> Result<Regex> { Regex::new(pattern).map_err(|e| Error::InvalidConfig(e.to_string())) }

impl OutputFormatter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            json_block: compile(r"(?s)\{.*\}")?,
            sentence_end: compile(r"[.!?]")?,
            step_marker: compile(r"(?i)(?:step\s*)?(\d+)[.:)]\s*")?,
            final_answer: compile(r"(?i)(?:answer|result|solution)[:\s]*(.+?)(?:[.\n]|$)")?,
            caption_prefix: compile(r"(?i)^(?:what|how|why|explain|describe|solve|find|calculate)\s+")?,
        })
    }

    /// Parse the whole text as a JSON object, else the outermost `{...}` span.
    fn parse_object(&self, raw: &str) -> Option<Map<String, Value>> {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
            return Some(map);
        }
        let span = self.json_block.find(raw)?;
        match serde_json::from_str::<Value>(span.as_str()) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn format_general(&self, raw: &str, question: &str) -> GeneralAnswer {
        match self.parse_object(raw) {
            Some(data) => general_from_json(&data),
            None => {
                debug!("general answer is not JSON, using text fallback");
                self.general_from_text(raw, question)
            }
        }
    }

    pub fn format_math(&self, raw: &str, question: &str) -> MathAnswer {
        match self.parse_object(raw) {
            Some(data) => math_from_json(&data),
            None => {
                debug!("math answer is not JSON, using text fallback");
                self.math_from_text(raw, question)
            }
        }
    }

    fn general_from_text(&self, text: &str, question: &str) -> GeneralAnswer {
        let sentences: Vec<&str> = self.sentence_end.split(text).map(str::trim).filter(|s| !s.is_empty()).collect();
        let summary = sentences.first().map_or_else(|| text.to_string(), |s| (*s).to_string());
        let bullet_points = sentences
            .iter()
            .skip(1)
            .take(FALLBACK_BULLETS)
            .map(|s| BulletPoint { point: (*s).to_string() })
            .collect();
        GeneralAnswer { summary, caption: self.caption(question), bullet_points, table: Vec::new() }
    }

    fn math_from_text(&self, text: &str, question: &str) -> MathAnswer {
        let markers: Vec<_> = self.step_marker.find_iter(text).collect();
        let mut steps: Vec<MathStep> = markers
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
                text[m.end()..end].trim()
            })
            .filter(|body| !body.is_empty())
            .enumerate()
            .map(|(i, body)| text_step(i + 1, format!("Step {}", i + 1), body))
            .collect();
        if steps.is_empty() {
            let head: String = text.chars().take(FALLBACK_STEP_CHARS).collect();
            steps.push(text_step(1, "Solution".to_string(), &head));
        }
        let final_answer = self
            .final_answer
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        MathAnswer {
            problem: question.to_string(),
            caption: self.caption(question),
            steps,
            final_answer,
            concept_used: Vec::new(),
            tips: Vec::new(),
        }
    }

    /// Short title derived from the question: leading question word and
    /// trailing `?` dropped, title-cased, capped at 50 characters.
    pub fn caption(&self, question: &str) -> String {
        let stripped = self.caption_prefix.replace(question, "");
        let stripped = stripped.strip_suffix('?').unwrap_or(&*stripped);
        let titled = title_case(stripped.trim());
        if titled.is_empty() {
            return DEFAULT_GENERAL_CAPTION.to_string();
        }
        if titled.chars().count() > CAPTION_MAX_CHARS {
            let cut: String = titled.chars().take(CAPTION_MAX_CHARS).collect();
            return format!("{cut}...");
        }
        titled
    }
}

impl ResponseFormatter for OutputFormatter {
    fn format(&self, raw: &str, question: &str, _subject: &str, is_computational: bool) -> ResponseBody {
        if is_computational {
            ResponseBody::Math(self.format_math(raw, question))
        } else {
            ResponseBody::General(self.format_general(raw, question))
        }
    }
}

fn text_step(number: usize, action: String, explanation: &str) -> MathStep {
    MathStep {
        step_number: u32::try_from(number).unwrap_or(u32::MAX),
        action,
        explanation: explanation.to_string(),
        expression: String::new(),
        result: String::new(),
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn field_text(data: &Map<String, Value>, key: &str, default: &str) -> String {
    data.get(key).map_or_else(|| default.to_string(), text_of)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(text_of).collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn general_from_json(data: &Map<String, Value>) -> GeneralAnswer {
    let bullet_points = match data.get("bullet_points") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(BulletPoint { point: s.clone() }),
                Value::Object(obj) => Some(BulletPoint {
                    point: obj.get("point").map_or_else(|| Value::Object(obj.clone()).to_string(), text_of),
                }),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    let table = match data.get("table") {
        Some(Value::Array(rows)) => rows.clone(),
        _ => Vec::new(),
    };
    GeneralAnswer {
        summary: field_text(data, "summary", ""),
        caption: field_text(data, "caption", DEFAULT_GENERAL_CAPTION),
        bullet_points,
        table,
    }
}

fn math_from_json(data: &Map<String, Value>) -> MathAnswer {
    let steps = match data.get("steps") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .enumerate()
            .map(|(i, step)| MathStep {
                step_number: step
                    .get("step_number")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(u32::try_from(i + 1).unwrap_or(u32::MAX)),
                action: field_text(step, "action", ""),
                explanation: field_text(step, "explanation", ""),
                expression: field_text(step, "expression", ""),
                result: field_text(step, "result", ""),
            })
            .collect(),
        _ => Vec::new(),
    };
    MathAnswer {
        problem: field_text(data, "problem", ""),
        caption: field_text(data, "caption", DEFAULT_MATH_CAPTION),
        steps,
        final_answer: field_text(data, "final_answer", ""),
        concept_used: string_list(data.get("concept_used")),
        tips: string_list(data.get("tips")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter() -> OutputFormatter { OutputFormatter::new().unwrap() }

    #[test]
    fn caption_strips_question_word_and_mark() {
        let f = formatter();
        assert_eq!(f.caption("What are properties of alcohol?"), "Are Properties Of Alcohol");
        assert_eq!(f.caption("Solve: 2x + 5 = 15"), "Solve: 2X + 5 = 15");
        assert_eq!(f.caption("?"), "Response");
        let long = f.caption(&"word ".repeat(20));
        assert!(long.ends_with("..."));
        assert_eq!(long.chars().count(), 53);
    }

    #[test]
    fn plain_text_answer_splits_into_summary_and_four_bullets() {
        let raw = "Plants make food by photosynthesis. They need sunlight. They need water. \
                   Chlorophyll absorbs light! Oxygen is released. Glucose is stored?";
        let answer = formatter().format_general(raw, "what is photosynthesis?");
        assert_eq!(answer.summary, "Plants make food by photosynthesis");
        let points: Vec<&str> = answer.bullet_points.iter().map(|b| b.point.as_str()).collect();
        assert_eq!(points, ["They need sunlight", "They need water", "Chlorophyll absorbs light", "Oxygen is released"]);
        assert_eq!(answer.caption, "Is Photosynthesis");
        assert!(answer.table.is_empty());
    }

    #[test]
    fn numbered_math_text_becomes_steps_with_final_answer() {
        let raw = "Step 1: Subtract 5 from both sides to get 2x = 10\nStep 2: Divide both sides by two\nThe answer: x = 5";
        let answer = formatter().format_math(raw, "Solve: 2x + 5 = 15");
        assert_eq!(answer.steps.len(), 2);
        assert_eq!(answer.steps[0].step_number, 1);
        assert_eq!(answer.steps[0].action, "Step 1");
        assert_eq!(answer.steps[0].explanation, "Subtract 5 from both sides to get 2x = 10");
        assert_eq!(answer.steps[1].action, "Step 2");
        assert_eq!(answer.final_answer, "x = 5");
        assert_eq!(answer.problem, "Solve: 2x + 5 = 15");
    }

    #[test]
    fn unnumbered_math_text_is_one_capped_solution_step() {
        let raw = "Think about it carefully ".repeat(30);
        let answer = formatter().format_math(&raw, "find the area");
        assert_eq!(answer.steps.len(), 1);
        assert_eq!(answer.steps[0].action, "Solution");
        assert_eq!(answer.steps[0].explanation.chars().count(), FALLBACK_STEP_CHARS);
        assert!(answer.final_answer.is_empty());
    }

    #[test]
    fn json_that_is_not_an_object_falls_back_to_text() {
        let f = formatter();
        let general = f.format_general("[1,2]", "why?");
        assert_eq!(general.summary, "[1,2]");
        assert!(general.bullet_points.is_empty());
        let math = f.format_math("[1,2]", "2 + 2");
        assert_eq!(math.steps.len(), 1);
        assert_eq!(math.steps[0].action, "Solution");
        assert_eq!(math.steps[0].explanation, "[1,2]");
    }

    #[test]
    fn title_case_restarts_after_non_letters() {
        assert_eq!(title_case("hello WORLD it's"), "Hello World It'S");
    }
}
