//! Keyword scoring with an ordered regex fallback, plus the independent
//! computational-problem detector.

use regex::{Regex, RegexSet};
use serde::Serialize;
use tracing::debug;

use tutor_core::routing::RoutingConfig;
use tutor_core::{Error, Language, MetadataFilter, Result, Subject};

/// Outcome of `SubjectClassifier::classify`. `subject` is `None` when neither
/// keywords nor the heuristic cascade produced a confident answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub subject: Option<Subject>,
    pub confidence: f32,
}

struct CompiledRule {
    subject: Subject,
    confidence: f32,
    patterns: RegexSet,
}

pub struct SubjectClassifier {
    /// (subject, lower-cased keywords) in enumeration order.
    keywords: Vec<(Subject, Vec<String>)>,
    heuristics: Vec<CompiledRule>,
    computation_subject: Subject,
    computation_confidence: f32,
    computation_patterns: RegexSet,
    stop_words: Vec<String>,
    token: Regex,
}

fn compile_set(patterns: &[String], what: &str) -> Result<RegexSet> {
    RegexSet::new(patterns).map_err(|e| Error::InvalidConfig(format!("{what} pattern: {e}")))
}

impl SubjectClassifier {
    pub fn new(config: &RoutingConfig) -> Result<Self> {
        let keywords = config
            .subjects
            .iter()
            .map(|s| (Subject::new(s.subject.clone()), s.keywords.iter().map(|k| k.to_lowercase()).collect()))
            .collect();
        let heuristics = config
            .heuristics
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    subject: Subject::new(rule.subject.clone()),
                    confidence: rule.confidence,
                    patterns: compile_set(&rule.patterns, "heuristic")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let token = Regex::new(r"\b\w+\b").map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(Self {
            keywords,
            heuristics,
            computation_subject: Subject::new(config.computation_subject.clone()),
            computation_confidence: config.computation_confidence,
            computation_patterns: compile_set(&config.computation_patterns, "computation")?,
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            token,
        })
    }

    pub fn subjects(&self) -> impl Iterator<Item = &Subject> { self.keywords.iter().map(|(s, _)| s) }

    pub fn computation_subject(&self) -> &Subject { &self.computation_subject }

    pub fn computation_confidence(&self) -> f32 { self.computation_confidence }

    /// Per-subject keyword hit counts in enumeration order. Each keyword counts
    /// once when it occurs anywhere in the lower-cased query.
    pub fn keyword_scores(&self, query: &str) -> Vec<(Subject, usize)> {
        let lower = query.to_lowercase();
        self.keywords
            .iter()
            .map(|(subject, words)| (subject.clone(), words.iter().filter(|w| lower.contains(w.as_str())).count()))
            .collect()
    }

    pub fn classify(&self, query: &str) -> Classification {
        let scores = self.keyword_scores(query);
        let total: usize = scores.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return self.classify_by_heuristics(query);
        }
        // Ties go to the earliest subject in enumeration order.
        let (best, best_score) = scores.iter().fold(&scores[0], |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        debug!(?scores, subject = %best, "keyword classification");
        Classification { subject: Some(best.clone()), confidence: *best_score as f32 / total as f32 }
    }

    fn classify_by_heuristics(&self, query: &str) -> Classification {
        let lower = query.to_lowercase();
        for rule in &self.heuristics {
            if rule.patterns.is_match(&lower) {
                debug!(subject = %rule.subject, "heuristic classification");
                return Classification { subject: Some(rule.subject.clone()), confidence: rule.confidence };
            }
        }
        Classification { subject: None, confidence: 0.0 }
    }

    /// True when the query reads like a problem to be worked out. Callers treat
    /// this as authoritative over `classify`.
    pub fn is_computational_problem(&self, query: &str) -> bool {
        self.computation_patterns.is_match(&query.to_lowercase())
    }

    /// Lower-cased word tokens minus stop words, longer than two characters,
    /// in order of appearance with duplicates kept.
    pub fn extract_topic_hints(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        self.token
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|w| w.chars().count() > 2 && !self.stop_words.iter().any(|s| s == w))
            .map(str::to_string)
            .collect()
    }
}

/// Filter narrowing a candidate pool to one subject and language, optionally
/// to a sub-subject and content type.
pub fn build_metadata_filter(
    subject: &Subject,
    language: Language,
    sub_subject: Option<&str>,
    content_type: Option<&str>,
) -> MetadataFilter {
    let mut filter = MetadataFilter::new().with("subject", subject.name()).with("language", language.as_str());
    if let Some(sub) = sub_subject {
        filter.insert("sub_subject", sub);
    }
    if let Some(kind) = content_type {
        filter.insert("content_type", kind);
    }
    filter
}
