use std::fs;

use serde_json::json;
use tempfile::TempDir;

use tutor_cli::{render_response, Bootstrap};
use tutor_core::{ChunkMetadata, DocumentChunk, Language, Subject};
use tutor_rag::{BulletPoint, GeneralAnswer, MathAnswer, MathStep, ResponseBody, ResponseMetadata, TutorResponse};

fn metadata(is_math: bool) -> ResponseMetadata {
    ResponseMetadata {
        subject: if is_math { "Maths".into() } else { "Science".into() },
        language: Language::English,
        is_computational_problem: is_math,
        documents_retrieved: 3,
        confidence: 0.8,
    }
}

#[test]
fn renders_general_answer_with_table() {
    let response = TutorResponse {
        body: ResponseBody::General(GeneralAnswer {
            summary: "Acids turn litmus red.".into(),
            caption: "Acids".into(),
            bullet_points: vec![BulletPoint { point: "sour taste".into() }],
            table: vec![json!({"header": "Properties", "rows": [{"property": "pH", "value": "< 7"}]})],
        }),
        metadata: metadata(false),
    };
    let text = render_response(&response);
    assert!(text.contains("📌 Acids"));
    assert!(text.contains("  • sour taste"));
    assert!(text.contains("    pH: < 7"));
    assert!(text.contains("Science"));
    assert!(text.contains("3 docs"));
}

#[test]
fn renders_math_steps_and_answer() {
    let response = TutorResponse {
        body: ResponseBody::Math(MathAnswer {
            problem: "2x + 5 = 15".into(),
            caption: "Linear Equation".into(),
            steps: vec![MathStep {
                step_number: 1,
                action: "Subtract 5".into(),
                explanation: String::new(),
                expression: "2x = 10".into(),
                result: String::new(),
            }],
            final_answer: "x = 5".into(),
            concept_used: vec!["Linear equations".into()],
            tips: Vec::new(),
        }),
        metadata: metadata(true),
    };
    let text = render_response(&response);
    assert!(text.contains("Step 1: Subtract 5"));
    assert!(text.contains("    2x = 10"));
    assert!(text.contains("✅ Answer: x = 5"));
    assert!(text.contains("math"));
}

#[test]
fn bootstrap_builds_persists_and_reopens_with_fake_embeddings() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[paths]\nindex_dir = \"indices\"\n\n[embedding]\nbackend = \"fake\"\n",
    )
    .unwrap();

    let boot = Bootstrap::load(Some(dir.path())).unwrap();
    let index_dir = boot.index_dir(None).unwrap();
    assert_eq!(index_dir, dir.path().join("indices"));

    let store = boot.new_store().unwrap();
    let chunk = DocumentChunk::new("plants make food from light", ChunkMetadata::default());
    store.build(&Subject::new("Science"), vec![chunk]).unwrap();
    assert_eq!(store.persist(&index_dir).unwrap(), 1);

    let reopened = boot.open_store(&index_dir).unwrap();
    assert_eq!(reopened.stats()[0], (Subject::new("Science"), 1));
    let hits = reopened.search("plants", &Subject::new("Science"), 3, None).unwrap();
    assert_eq!(hits.len(), 1);
}
