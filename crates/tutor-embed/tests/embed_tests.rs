use tutor_core::config::{EmbeddingBackend, Settings};
use tutor_core::traits::Embedder;
use tutor_embed::{get_default_embedder, normalize_l2, truncate_for_embedding, FakeEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let mut settings = Settings::default();
    settings.embedding.backend = EmbeddingBackend::Fake;
    let embedder = get_default_embedder(&settings).expect("embedder");
    let v1 = embedder.embed("hello world").expect("embed");
    let v2 = embedder.embed("hello world").expect("embed");

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
    assert!(embedder.embedder_id().starts_with("fake:"));
}

#[test]
fn fake_embedder_separates_unrelated_texts() {
    let embedder = FakeEmbedder::new(256);
    let a = embedder.embed("photosynthesis in green plants").unwrap();
    let b = embedder.embed("photosynthesis in green plants").unwrap();
    let c = embedder.embed("mughal empire dynasty").unwrap();
    let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
    assert!(dot(&a, &b) > dot(&a, &c));
}

#[test]
fn empty_text_embeds_to_zero_vector() {
    let v = FakeEmbedder::new(8).embed("").unwrap();
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn normalize_leaves_zero_vectors_alone() {
    let mut zero = vec![0.0f32; 4];
    normalize_l2(&mut zero);
    assert_eq!(zero, vec![0.0; 4]);
    let mut v = vec![3.0f32, 4.0];
    normalize_l2(&mut v);
    assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
}

#[test]
fn truncation_never_exceeds_budget() {
    let text = "word ".repeat(300);
    for budget in [1usize, 7, 50, 500] {
        let cut = truncate_for_embedding(&text, budget);
        assert!(cut.chars().count() <= budget);
        assert!(text.starts_with(cut));
    }
}

#[test]
fn zero_dimension_is_raised_to_one() {
    let embedder = FakeEmbedder::new(0);
    let v = embedder.embed("photosynthesis in green plants").unwrap();
    assert_eq!(v.len(), 1);
    assert_eq!(embedder.embedder_id(), "fake:xxhash:d1");
}
