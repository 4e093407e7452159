use std::fs;

use tempfile::TempDir;

use tutor_core::config::{Config, EmbeddingBackend, Settings};
use tutor_core::loader::ChunkLoader;
use tutor_core::{ChunkMetadata, MetadataFilter, Subject};

fn meta(subject: &str, topic: Option<&str>) -> ChunkMetadata {
    ChunkMetadata { subject: Some(subject.into()), topic: topic.map(Into::into), page_number: Some(12), ..Default::default() }
}

#[test]
fn filter_requires_every_field_present_and_equal() {
    let filter = MetadataFilter::new().with("subject", "Science").with("topic", "Acids");
    assert!(filter.matches(&meta("Science", Some("Acids"))));
    assert!(!filter.matches(&meta("Science", Some("Metals"))), "unequal value rejects");
    assert!(!filter.matches(&meta("Science", None)), "absent field is not a match");
}

#[test]
fn filter_compares_page_numbers_as_text() {
    let filter: MetadataFilter = "page_number=12".parse().expect("parse");
    assert!(filter.matches(&meta("Maths", None)));
    let other: MetadataFilter = "page_number=13".parse().expect("parse");
    assert!(!other.matches(&meta("Maths", None)));
}

#[test]
fn filter_parse_rejects_unknown_fields_and_bad_terms() {
    assert!("colour=red".parse::<MetadataFilter>().is_err());
    assert!("subject".parse::<MetadataFilter>().is_err());
    let f: MetadataFilter = " subject = Maths , grade=8 ".parse().expect("parse");
    assert_eq!(f.len(), 2);
    assert!(MetadataFilter::new().matches(&ChunkMetadata::default()), "empty filter matches anything");
}

#[test]
fn subject_key_is_lowercase_and_matching_ignores_case() {
    let s = Subject::new("Social_Science");
    assert_eq!(s.key(), "social_science");
    assert!(s.matches("social_science"));
    assert!(!s.matches("science"));
}

#[test]
fn default_settings_validate() {
    let settings = Settings::default();
    settings.validate().expect("defaults are valid");
    assert_eq!(settings.retrieval.top_k, 5);
    assert_eq!(settings.retrieval.context_budget, 4000);
    assert_eq!(settings.routing.subject_order().len(), 5);
    assert_eq!(settings.routing.subjects[0].subject, "Science");
}

#[test]
fn config_merges_toml_and_env() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [retrieval]
            top_k = 7

            [embedding]
            backend = "fake"
            "#,
        )?;
        jail.set_env("APP_RETRIEVAL__CONTEXT_BUDGET", "1200");
        let config = Config::load_from(jail.directory()).expect("load");
        let settings = config.settings().expect("settings");
        assert_eq!(settings.retrieval.top_k, 7);
        assert_eq!(settings.retrieval.context_budget, 1200);
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Fake);
        assert_eq!(settings.retrieval.low_confidence_threshold, 0.3, "untouched keys keep defaults");
        assert_eq!(config.index_dir().expect("index dir"), jail.directory().join("vector_stores"));
        Ok(())
    });
}

#[test]
fn config_rejects_invalid_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[retrieval]\ntop_k = 0\n")?;
        assert!(Config::load_from(jail.directory()).is_err());
        Ok(())
    });
}

#[test]
fn loader_groups_by_subject_and_skips_unknown() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("nested");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("a.jsonl"),
        concat!(
            r#"{"text":"Acids turn litmus red","metadata":{"subject":"science"}}"#, "\n",
            "\n",
            r#"{"text":"Fractions","metadata":{"subject":"Maths","page_number":3}}"#, "\n",
            r#"{"text":"Orphan","metadata":{"subject":"Art"}}"#, "\n",
        ),
    )
    .unwrap();
    fs::write(tmp.path().join("ignored.txt"), "not a chunk file").unwrap();

    let loader = ChunkLoader::new(vec![Subject::new("Science"), Subject::new("Maths"), Subject::new("English")]);
    let grouped = loader.load_directory(tmp.path()).expect("load");

    assert_eq!(grouped.len(), 3);
    assert_eq!(grouped[0].1.len(), 1);
    assert_eq!(grouped[1].1[0].metadata.page_number, Some(3));
    assert!(grouped[2].1.is_empty());
}

#[test]
fn loader_reports_malformed_lines() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.jsonl"), "{not json}\n").unwrap();
    let loader = ChunkLoader::new(vec![Subject::new("Science")]);
    let err = loader.load_directory(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("line 1"));
}
