//! Structured answers handed to presentation layers.
//!
//! Every user-visible outcome, including "no results" and generation
//! failures, is one of these values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tutor_core::Language;

pub const NO_RESULTS_CAPTION: &str = "No Results Found";
pub const UNKNOWN_SUBJECT: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletPoint {
    pub point: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralAnswer {
    pub summary: String,
    pub caption: String,
    pub bullet_points: Vec<BulletPoint>,
    /// Free-form tables exactly as the model produced them.
    pub table: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathStep {
    pub step_number: u32,
    pub action: String,
    pub explanation: String,
    pub expression: String,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathAnswer {
    pub problem: String,
    pub caption: String,
    pub steps: Vec<MathStep>,
    pub final_answer: String,
    pub concept_used: Vec<String>,
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Math(MathAnswer),
    General(GeneralAnswer),
}

impl ResponseBody {
    pub fn caption(&self) -> &str {
        match self {
            ResponseBody::Math(m) => &m.caption,
            ResponseBody::General(g) => &g.caption,
        }
    }
}

/// Routing provenance attached to every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub subject: String,
    pub language: Language,
    pub is_computational_problem: bool,
    pub documents_retrieved: usize,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorResponse {
    #[serde(flatten)]
    pub body: ResponseBody,
    #[serde(rename = "_metadata")]
    pub metadata: ResponseMetadata,
}

impl TutorResponse {
    /// Terminal outcome when nothing could be retrieved for the question.
    pub fn no_results(language: Language) -> Self {
        let summary = match language {
            Language::Tamil => "மன்னிக்கவும், இந்த கேள்விக்கான தகவல்கள் கிடைக்கவில்லை.",
            Language::English => "Sorry, I couldn't find relevant information for your question.",
        };
        Self {
            body: ResponseBody::General(GeneralAnswer {
                summary: summary.to_string(),
                caption: NO_RESULTS_CAPTION.to_string(),
                bullet_points: Vec::new(),
                table: Vec::new(),
            }),
            metadata: ResponseMetadata {
                subject: UNKNOWN_SUBJECT.to_string(),
                language,
                is_computational_problem: false,
                documents_retrieved: 0,
                confidence: 0.0,
            },
        }
    }

    pub fn is_math(&self) -> bool { matches!(self.body, ResponseBody::Math(_)) }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> { serde_json::to_string_pretty(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_serializes_under_underscore_key() {
        let json = serde_json::to_value(TutorResponse::no_results(Language::English)).unwrap();
        assert_eq!(json["caption"], "No Results Found");
        assert_eq!(json["_metadata"]["subject"], "Unknown");
        assert_eq!(json["_metadata"]["documents_retrieved"], 0);
        assert!(json.get("body").is_none());
    }
}
