//! Domain types shared by routing, the index store and the orchestrator.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A top-level curriculum category with its own similarity index.
///
/// The display name keeps its configured casing (`Social_Science`); `key()`
/// is the stable lowercase identifier used for artifact names and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }

    pub fn name(&self) -> &str { &self.0 }

    pub fn key(&self) -> String { self.0.to_lowercase() }

    /// Case-insensitive comparison against a raw subject string.
    pub fn matches(&self, raw: &str) -> bool { self.0.eq_ignore_ascii_case(raw.trim()) }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// The two supported query languages. English is primary, Tamil secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Tamil,
}

impl Language {
    pub fn is_primary(self) -> bool { matches!(self, Language::English) }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Tamil => "Tamil",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Per-chunk metadata. Every field may be absent; ingestion fills what it can.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl ChunkMetadata {
    pub const FIELDS: [&'static str; 10] = [
        "subject",
        "sub_subject",
        "grade",
        "term",
        "chapter",
        "topic",
        "content_type",
        "language",
        "source_file",
        "page_number",
    ];

    /// Look up a field by its schema name. Unknown names and unset fields are `None`.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "subject" => self.subject.as_deref(),
            "sub_subject" => self.sub_subject.as_deref(),
            "grade" => self.grade.as_deref(),
            "term" => self.term.as_deref(),
            "chapter" => self.chapter.as_deref(),
            "topic" => self.topic.as_deref(),
            "content_type" => self.content_type.as_deref(),
            "language" => self.language.as_deref(),
            "source_file" => self.source_file.as_deref(),
            "page_number" => return self.page_number.map(|p| Cow::Owned(p.to_string())),
            _ => None,
        };
        value.map(Cow::Borrowed)
    }
}

/// A chunk of a source document that is independently embedded and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { text: text.into(), metadata }
    }
}

/// A retrieved chunk with its similarity score.
///
/// `score` is inner product over L2-normalized vectors: higher is better, and
/// it is only meaningful relative to other scores from the same subject index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Field-by-field equality filter applied after retrieval.
///
/// A chunk matches only when every required field is present in its metadata
/// and equal to the required value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(BTreeMap<String, String>);

impl MetadataFilter {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        self.0
            .iter()
            .all(|(field, want)| metadata.field(field).is_some_and(|have| have == want.as_str()))
    }
}

impl FromStr for MetadataFilter {
    type Err = Error;

    /// Parses `field=value[,field=value...]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut filter = Self::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (field, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::InvalidConfig(format!("filter term '{pair}' is not field=value")))?;
            let field = field.trim();
            if !ChunkMetadata::FIELDS.contains(&field) {
                return Err(Error::InvalidConfig(format!("unknown metadata field '{field}'")));
            }
            filter.insert(field, value.trim());
        }
        Ok(filter)
    }
}

/// How a query was routed. Computed once per query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub subject: Option<Subject>,
    pub confidence: f32,
    pub language: Language,
    pub is_computational: bool,
}
