//! Routing tables: per-subject keywords, the heuristic cascade and the
//! computational-problem patterns.
//!
//! These are plain configuration. `tutor-route` compiles them once into a
//! classifier; nothing mutates them at runtime.

use serde::{Deserialize, Serialize};

use crate::types::Subject;

/// Keywords matched by substring containment against the lower-cased query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectKeywords {
    pub subject: String,
    pub keywords: Vec<String>,
}

/// One step of the ordered fallback cascade used when no keyword matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicRule {
    pub subject: String,
    pub confidence: f32,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Subject tables in enumeration order. Order breaks score ties and drives
    /// the first-non-empty fallback in the orchestrator.
    pub subjects: Vec<SubjectKeywords>,
    pub heuristics: Vec<HeuristicRule>,
    /// Subject forced when a query looks like a computational problem.
    pub computation_subject: String,
    pub computation_confidence: f32,
    pub computation_patterns: Vec<String>,
    pub stop_words: Vec<String>,
    /// Fraction of secondary-script letters above which a query is secondary-language.
    pub secondary_script_threshold: f32,
}

impl RoutingConfig {
    pub fn subject_order(&self) -> Vec<Subject> {
        self.subjects.iter().map(|s| Subject::new(s.subject.clone())).collect()
    }
}

fn strings(items: &[&str]) -> Vec<String> { items.iter().map(|s| (*s).to_string()).collect() }

impl Default for RoutingConfig {
    fn default() -> Self {
        let subjects = vec![
            SubjectKeywords {
                subject: "Science".into(),
                keywords: strings(&[
                    "science", "physics", "chemistry", "biology", "atom", "molecule", "cell", "force",
                    "energy", "matter", "experiment", "reaction", "element", "compound", "acid", "base",
                    "metal", "plant", "animal", "body", "organ", "ecosystem", "environment",
                    "photosynthesis", "respiration", "விஞ்ஞானம்", "இயற்பியல்", "வேதியியல்", "உயிரியல்",
                ]),
            },
            SubjectKeywords {
                subject: "Maths".into(),
                keywords: strings(&[
                    "math", "maths", "mathematics", "algebra", "geometry", "arithmetic", "equation",
                    "number", "calculate", "solve", "formula", "theorem", "fraction", "decimal",
                    "percentage", "angle", "triangle", "circle", "கணிதம்", "எண்கள்", "கணக்கு", "சமன்பாடு",
                ]),
            },
            SubjectKeywords {
                subject: "English".into(),
                keywords: strings(&[
                    "english", "grammar", "vocabulary", "sentence", "noun", "verb", "adjective", "pronoun",
                    "tense", "paragraph", "essay", "comprehension", "story", "poem", "poetry", "novel",
                    "character", "author", "literature", "prose", "drama", "play", "adventure", "hero",
                    "plot", "theme", "fiction", "lesson", "chapter", "reading", "writing", "don quixote",
                    "quixote",
                ]),
            },
            SubjectKeywords {
                subject: "Social_Science".into(),
                keywords: strings(&[
                    "social", "history", "geography", "civics", "economics", "map", "continent", "country",
                    "government", "democracy", "civilization", "bhakti", "movement", "mughal", "empire",
                    "kingdom", "independence", "freedom", "revolt", "war", "battle", "king", "queen",
                    "ruler", "dynasty", "ancient", "medieval", "modern", "revolution", "reform",
                    "colonialism", "british", "india", "indian", "nation", "culture", "religion", "temple",
                    "சமூக அறிவியல்", "வரலாறு", "புவியியல்",
                ]),
            },
            SubjectKeywords {
                subject: "Tamil".into(),
                keywords: strings(&["தமிழ்", "இலக்கணம்", "இலக்கியம்", "கவிதை", "உரைநடை", "திருக்குறள்", "பாடல்", "சொல்"]),
            },
        ];

        let heuristics = vec![
            HeuristicRule {
                subject: "Maths".into(),
                confidence: 0.7,
                patterns: strings(&[
                    r"\d+\s*[+\-*/=]\s*\d+",
                    "solve",
                    "calculate",
                    "equation",
                    "how many",
                    "find the value",
                    r"x\s*[+\-*/=]",
                ]),
            },
            HeuristicRule {
                subject: "Science".into(),
                confidence: 0.6,
                patterns: strings(&[
                    "photosynthesis",
                    "chemical",
                    "physical properties",
                    "reaction",
                    "experiment",
                    "organism",
                    "cell structure",
                ]),
            },
        ];

        let computation_patterns = strings(&[
            // action verbs
            "solve", "calculate", "find the value", "evaluate", "simplify", "factorize", "prove that",
            // operators next to numbers or variables
            r"\d+\s*[+\-*/=]", r"x\s*[+\-*/=]",
            "area of", "perimeter of", "sum of", "product of", "how many", "how much", "what is the",
            "total", "ratio", "proportion",
            // percentages
            r"\d+\s*%", r"\d+\s*percent", r"\d+\s*சதவீதம்",
            // units
            r"\d+\s*grams?", r"\d+\s*kg", r"\d+\s*cm", r"\d+\s*meters?",
            r"\d+\s*கிராம்", r"\d+\s*கிலோ", r"\d+\s*மீட்டர்", r"\d+\s*செமீ",
            // Tamil problem words: calculate, solve, find, how many, how much, total,
            // required, amount, mixture, ratio, percentage, obtain
            "கணக்கிடு", "தீர்க்க", "கண்டுபிடி", "எத்தனை", "எவ்வளவு", "மொத்தம்", "தேவைப்படும்",
            "அளவு", "கலவை", "விகிதம்", "சதவீதம்", "பெற",
        ]);

        let stop_words = strings(&[
            "what", "is", "are", "the", "of", "in", "a", "an", "how", "why", "explain", "describe",
            "tell", "me", "about", "give", "list", "என்ன", "எப்படி", "ஏன்", "பற்றி",
        ]);

        Self {
            subjects,
            heuristics,
            computation_subject: "Maths".into(),
            computation_confidence: 0.8,
            computation_patterns,
            stop_words,
            secondary_script_threshold: 0.2,
        }
    }
}
