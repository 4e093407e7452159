use std::sync::{Arc, Mutex};

use tutor_core::config::Settings;
use tutor_core::traits::{Embedder, GenerationOptions, Generator};
use tutor_core::{ChunkMetadata, DocumentChunk, Error, Language, Result, Subject};
use tutor_index::{IndexStore, StoreSettings};
use tutor_rag::{ResponseBody, RetrievalPath, TutorEngine};

const AXES: [&str; 4] = ["triangle", "geometry", "zebra", "quartz"];

struct AxisEmbedder;

impl Embedder for AxisEmbedder {
    fn embedder_id(&self) -> &str { "test:axis" }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = AXES.iter().map(|w| lower.matches(w).count() as f32).collect();
        if v.iter().all(|x| *x == 0.0) {
            v = vec![0.1; AXES.len()];
        }
        Ok(v)
    }
}

/// Returns a fixed reply (or error) and records every prompt it receives.
struct ScriptedGenerator {
    reply: std::result::Result<String, String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    fn replying(reply: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        (Self { reply: Ok(reply.to_string()), prompts: prompts.clone() }, prompts)
    }

    fn failing(message: &str) -> Self { Self { reply: Err(message.to_string()), prompts: Arc::default() } }
}

impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str { "scripted" }

    fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(Error::Generation)
    }
}

fn chunk(text: &str, source: &str) -> DocumentChunk {
    DocumentChunk::new(text, ChunkMetadata { source_file: Some(source.into()), topic: Some("Shapes".into()), ..Default::default() })
}

fn store_with(subjects: &[(&str, Vec<DocumentChunk>)]) -> Arc<IndexStore> {
    let settings = Settings::default();
    let store = IndexStore::new(settings.routing.subject_order(), Arc::new(AxisEmbedder), StoreSettings::from(&settings));
    for (name, chunks) in subjects {
        store.build(&Subject::new(*name), chunks.clone()).unwrap();
    }
    Arc::new(store)
}

fn engine(store: Arc<IndexStore>, generator: ScriptedGenerator) -> TutorEngine {
    TutorEngine::new(store, Box::new(generator), &Settings::default()).unwrap()
}

#[test]
fn computational_question_is_forced_to_maths() {
    let store = store_with(&[
        ("Science", vec![chunk("quartz crystal", "sci.pdf")]),
        ("Maths", vec![chunk("linear equations with one variable", "maths.pdf")]),
    ]);
    let (generator, _) = ScriptedGenerator::replying("{}");
    let retrieval = engine(store, generator).answer_retrieval("Solve: 2x + 5 = 15", None, 5).unwrap();
    assert!(retrieval.decision.is_computational);
    assert_eq!(retrieval.decision.subject, Some(Subject::new("Maths")));
    assert_eq!(retrieval.decision.confidence, 0.8);
    assert_eq!(retrieval.path, RetrievalPath::Scoped);
    assert!(retrieval.pool.iter().all(|c| c.subject.name() == "Maths"));
}

#[test]
fn empty_routed_subject_adopts_first_non_empty_subject_not_best_score() {
    // Maths is not built. English holds the closer match, Science comes first.
    let store = store_with(&[
        ("Science", vec![chunk("quartz zebra", "sci.pdf")]),
        ("English", vec![chunk("triangle geometry story", "eng.pdf")]),
    ]);
    let (generator, _) = ScriptedGenerator::replying("{}");
    let retrieval = engine(store, generator).answer_retrieval("geometry of a triangle", None, 5).unwrap();
    assert_eq!(retrieval.decision.subject, Some(Subject::new("Maths")));
    assert!(retrieval.decision.confidence >= 0.3);
    assert_eq!(retrieval.path, RetrievalPath::FirstNonEmpty);
    assert_eq!(retrieval.subject, Some(Subject::new("Science")));
    assert_eq!(retrieval.pool.len(), 1);
}

#[test]
fn unrouted_question_takes_best_score_across_subjects() {
    let store = store_with(&[
        ("Science", vec![chunk("quartz zebra", "sci.pdf"), chunk("quartz only", "sci.pdf")]),
        ("English", vec![chunk("zebra zebra", "eng.pdf")]),
    ]);
    let (generator, _) = ScriptedGenerator::replying("{}");
    let retrieval = engine(store, generator).answer_retrieval("who drew the zebra?", None, 2).unwrap();
    assert_eq!(retrieval.decision.subject, None);
    assert_eq!(retrieval.decision.confidence, 0.0);
    assert_eq!(retrieval.path, RetrievalPath::BestAcrossSubjects);
    assert_eq!(retrieval.subject, Some(Subject::new("English")));
    assert_eq!(retrieval.pool.len(), 2);
    assert_eq!(retrieval.pool[0].result.chunk.text, "zebra zebra");
    assert_eq!(retrieval.pool[1].subject, Subject::new("Science"));
    assert!(retrieval.pool[0].result.score >= retrieval.pool[1].result.score);
}

#[test]
fn override_keeps_scope_while_computation_flag_follows_text() {
    let store = store_with(&[
        ("Science", vec![chunk("quartz crystal", "sci.pdf")]),
        ("Maths", vec![chunk("triangle", "maths.pdf")]),
    ]);
    let (generator, _) = ScriptedGenerator::replying(r#"{"problem": "p", "final_answer": "x = 5"}"#);
    let engine = engine(store, generator);

    let retrieval = engine.answer_retrieval("Solve: 2x + 5 = 15", Some("science"), 5).unwrap();
    assert_eq!(retrieval.decision.subject, Some(Subject::new("Maths")));
    assert_eq!(retrieval.subject, Some(Subject::new("Science")));

    let response = engine.answer("Solve: 2x + 5 = 15", Some("science"), 5).unwrap();
    assert!(response.is_math());
    assert_eq!(response.metadata.subject, "Science");
    assert!(response.metadata.is_computational_problem);
    assert_eq!(response.metadata.confidence, 0.8);

    let plain = engine.answer_retrieval("tell me about quartz", Some("Science"), 5).unwrap();
    assert_eq!(plain.decision.confidence, 1.0);
}

#[test]
fn empty_store_yields_language_appropriate_no_results() {
    let (generator, prompts) = ScriptedGenerator::replying("{}");
    let engine = engine(store_with(&[]), generator);

    let english = engine.answer("who drew the zebra?", None, 5).unwrap();
    assert_eq!(english.body.caption(), "No Results Found");
    assert_eq!(english.metadata.subject, "Unknown");
    assert_eq!(english.metadata.documents_retrieved, 0);
    assert_eq!(english.metadata.confidence, 0.0);

    let tamil = engine.answer("மது பற்றிய பண்புகள் என்ன?", None, 5).unwrap();
    assert_eq!(tamil.metadata.language, Language::Tamil);
    match &tamil.body {
        ResponseBody::General(g) => assert_eq!(g.summary, "மன்னிக்கவும், இந்த கேள்விக்கான தகவல்கள் கிடைக்கவில்லை."),
        ResponseBody::Math(_) => panic!("no-results is a general answer"),
    }
    assert!(prompts.lock().unwrap().is_empty(), "generator must not be called");
}

#[test]
fn answer_sends_context_and_directive_then_annotates() {
    let store = store_with(&[("Science", vec![chunk("quartz is a mineral", "rocks.pdf")])]);
    let reply = r#"Here you go: {"summary": "Quartz is hard.", "caption": "Quartz", "bullet_points": ["hard", {"point": "clear"}], "table": []}"#;
    let (generator, prompts) = ScriptedGenerator::replying(reply);
    let response = engine(store, generator).answer("who drew the zebra?", None, 5).unwrap();

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[Source: rocks.pdf - Shapes]\nquartz is a mineral"));
    assert!(prompts[0].starts_with("CRITICAL LANGUAGE REQUIREMENT: You MUST respond ONLY in English"));

    match &response.body {
        ResponseBody::General(g) => {
            assert_eq!(g.caption, "Quartz");
            assert_eq!(g.bullet_points.iter().map(|b| b.point.as_str()).collect::<Vec<_>>(), vec!["hard", "clear"]);
        }
        ResponseBody::Math(_) => panic!("expected a general answer"),
    }
    assert_eq!(response.metadata.subject, "Science");
    assert_eq!(response.metadata.documents_retrieved, 1);
}

#[test]
fn generation_failure_becomes_error_shaped_answer() {
    let store = store_with(&[("Science", vec![chunk("quartz", "rocks.pdf")])]);
    let engine = engine(store, ScriptedGenerator::failing("connection refused"));
    let response = engine.answer("who drew the zebra?", None, 5).unwrap();
    match &response.body {
        ResponseBody::General(g) => {
            assert_eq!(g.caption, "Error");
            assert!(g.summary.starts_with("Error generating response:"));
            assert!(g.summary.contains("connection refused"));
        }
        ResponseBody::Math(_) => panic!("expected a general answer"),
    }
    assert_eq!(response.metadata.documents_retrieved, 1);
}

#[test]
fn stats_report_counts_and_models() {
    let store = store_with(&[("Tamil", vec![chunk("quartz", "t.pdf"), chunk("zebra", "t.pdf")])]);
    let (generator, _) = ScriptedGenerator::replying("{}");
    let stats = engine(store, generator).stats();
    assert_eq!(stats.llm_model, "scripted");
    assert_eq!(stats.embedder_id, "test:axis");
    assert_eq!(stats.subjects.len(), 5);
    assert_eq!(stats.subjects[4], (Subject::new("Tamil"), 2));
}
