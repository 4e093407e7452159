//! Retrieval orchestration: route the question, pick a search scope, fall back
//! when the scope comes up empty, then generate and annotate the answer.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use tutor_core::config::Settings;
use tutor_core::traits::{GenerationOptions, Generator};
use tutor_core::{Result, RoutingDecision, SearchResult, Subject};
use tutor_index::IndexStore;
use tutor_route::{LanguageIdentifier, SubjectClassifier};

use crate::context::build_context;
use crate::format::{OutputFormatter, ResponseFormatter};
use crate::generate::generation_error_body;
use crate::prompt::compose_prompt;
use crate::response::{ResponseMetadata, TutorResponse, UNKNOWN_SUBJECT};

/// A pool entry tagged with the subject index it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub subject: Subject,
    pub result: SearchResult,
}

/// Which branch of the fallback protocol produced the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetrievalPath {
    /// The routed (or overridden) subject answered on its own.
    Scoped,
    /// Routing was missing or under the confidence floor; the best score across
    /// every subject won.
    BestAcrossSubjects,
    /// The scoped search was empty; the first non-empty subject in enumeration
    /// order was adopted, regardless of score.
    FirstNonEmpty,
    /// Nothing anywhere.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub decision: RoutingDecision,
    /// Subject whose results make up the pool; for the cross-subject path the
    /// subject of the best hit.
    pub subject: Option<Subject>,
    pub path: RetrievalPath,
    pub pool: Vec<RetrievedChunk>,
}

impl Retrieval {
    pub fn results(&self) -> impl Iterator<Item = &SearchResult> { self.pool.iter().map(|c| &c.result) }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub subjects: Vec<(Subject, usize)>,
    pub llm_model: String,
    pub embedder_id: String,
}

pub struct TutorEngine {
    store: Arc<IndexStore>,
    language: LanguageIdentifier,
    classifier: SubjectClassifier,
    generator: Box<dyn Generator>,
    formatter: Box<dyn ResponseFormatter>,
    options: GenerationOptions,
    top_k: usize,
    low_confidence_threshold: f32,
    context_budget: usize,
}

impl TutorEngine {
    pub fn new(store: Arc<IndexStore>, generator: Box<dyn Generator>, settings: &Settings) -> Result<Self> {
        Ok(Self {
            store,
            language: LanguageIdentifier::new(settings.routing.secondary_script_threshold),
            classifier: SubjectClassifier::new(&settings.routing)?,
            generator,
            formatter: Box::new(OutputFormatter::new()?),
            options: settings.generation.clone(),
            top_k: settings.retrieval.top_k,
            low_confidence_threshold: settings.retrieval.low_confidence_threshold,
            context_budget: settings.retrieval.context_budget,
        })
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Box<dyn ResponseFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn default_top_k(&self) -> usize { self.top_k }

    pub fn store(&self) -> &IndexStore { &self.store }

    fn resolve_override(&self, raw: &str) -> Subject {
        self.classifier.subjects().find(|s| s.matches(raw)).cloned().unwrap_or_else(|| Subject::new(raw.trim()))
    }

    /// Route the question and return the candidate pool with the decision
    /// that produced it.
    ///
    /// An override fixes the search scope. Computational-problem detection is
    /// applied to the text independently and, when it fires, rewrites the
    /// decision's subject and confidence without moving the scope.
    pub fn answer_retrieval(&self, question: &str, subject_override: Option<&str>, top_k: usize) -> Result<Retrieval> {
        let language = self.language.detect(question);
        let overridden = subject_override.map(str::trim).filter(|s| !s.is_empty()).map(|s| self.resolve_override(s));
        let (mut subject, mut confidence) = match &overridden {
            Some(s) => (Some(s.clone()), 1.0),
            None => {
                let c = self.classifier.classify(question);
                (c.subject, c.confidence)
            }
        };
        let is_computational = self.classifier.is_computational_problem(question);
        if is_computational {
            subject = Some(self.classifier.computation_subject().clone());
            confidence = self.classifier.computation_confidence();
        }
        let decision = RoutingDecision { subject: subject.clone(), confidence, language, is_computational };
        info!(?subject, confidence, %language, is_computational, overridden = overridden.is_some(), "routed question");
        debug!(hints = ?self.classifier.extract_topic_hints(question), "topic hints");

        let scope = overridden.or(subject);
        let (subject, path, pool) = match scope {
            Some(scope) if confidence >= self.low_confidence_threshold => self.search_scoped(question, scope, top_k)?,
            _ => self.search_best_across(question, top_k)?,
        };
        info!(subject = ?subject, ?path, hits = pool.len(), "retrieval finished");
        Ok(Retrieval { decision, subject, path, pool })
    }

    fn search_best_across(&self, question: &str, top_k: usize) -> Result<(Option<Subject>, RetrievalPath, Vec<RetrievedChunk>)> {
        info!("low-confidence routing, searching every subject");
        let mut pool: Vec<RetrievedChunk> = self
            .store
            .search_all(question, top_k)?
            .into_iter()
            .flat_map(|(subject, hits)| hits.into_iter().map(move |result| RetrievedChunk { subject: subject.clone(), result }))
            .collect();
        // Scores from different subject indices are compared directly here.
        // That is an approximation: indices are built from different content.
        pool.sort_by(|a, b| b.result.score.total_cmp(&a.result.score));
        pool.truncate(top_k);
        match pool.first() {
            Some(best) => Ok((Some(best.subject.clone()), RetrievalPath::BestAcrossSubjects, pool)),
            None => Ok((None, RetrievalPath::Empty, pool)),
        }
    }

    fn search_scoped(&self, question: &str, scope: Subject, top_k: usize) -> Result<(Option<Subject>, RetrievalPath, Vec<RetrievedChunk>)> {
        let hits = self.store.search(question, &scope, top_k, None)?;
        if !hits.is_empty() {
            let pool = tag(&scope, hits);
            return Ok((Some(scope), RetrievalPath::Scoped, pool));
        }
        info!(subject = %scope, "no results in routed subject, trying the others");
        let first = self.store.search_all(question, top_k)?.into_iter().find(|(_, hits)| !hits.is_empty());
        match first {
            Some((subject, mut hits)) => {
                hits.truncate(top_k);
                let pool = tag(&subject, hits);
                Ok((Some(subject), RetrievalPath::FirstNonEmpty, pool))
            }
            None => Ok((None, RetrievalPath::Empty, Vec::new())),
        }
    }

    /// Retrieve, generate and format. Retrieval that finds nothing produces the
    /// no-results response without calling the generator; a generation failure
    /// produces an error-shaped answer.
    pub fn answer(&self, question: &str, subject_override: Option<&str>, top_k: usize) -> Result<TutorResponse> {
        let retrieval = self.answer_retrieval(question, subject_override, top_k)?;
        let decision = &retrieval.decision;
        if retrieval.pool.is_empty() {
            info!(language = %decision.language, "no documents retrieved");
            return Ok(TutorResponse::no_results(decision.language));
        }

        let context = build_context(retrieval.results(), self.context_budget);
        let prompt = compose_prompt(question, &context, decision.is_computational, decision.language);
        debug!(context_chars = context.chars().count(), model = self.generator.model_name(), "generating answer");
        let raw = self.generator.generate(&prompt, &self.options).unwrap_or_else(|e| {
            error!(error = %e, "generation failed");
            generation_error_body(&e)
        });

        let subject = retrieval.subject.as_ref().map_or(UNKNOWN_SUBJECT, Subject::name);
        let body = self.formatter.format(&raw, question, subject, decision.is_computational);
        Ok(TutorResponse {
            body,
            metadata: ResponseMetadata {
                subject: subject.to_string(),
                language: decision.language,
                is_computational_problem: decision.is_computational,
                documents_retrieved: retrieval.pool.len(),
                confidence: decision.confidence,
            },
        })
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            subjects: self.store.stats(),
            llm_model: self.generator.model_name().to_string(),
            embedder_id: self.store.embedder_id().to_string(),
        }
    }
}

fn tag(subject: &Subject, hits: Vec<SearchResult>) -> Vec<RetrievedChunk> {
    hits.into_iter().map(|result| RetrievedChunk { subject: subject.clone(), result }).collect()
}
