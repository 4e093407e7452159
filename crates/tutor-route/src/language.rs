use std::ops::RangeInclusive;

use serde::Serialize;

use tutor_core::Language;

/// Tamil Unicode block.
pub const SECONDARY_SCRIPT_RANGE: RangeInclusive<u32> = 0x0B80..=0x0BFF;

/// Default share of Tamil letters above which a text counts as Tamil. Kept low
/// on purpose: short mixed queries lean English unless Tamil is substantial.
pub const DEFAULT_SECONDARY_THRESHOLD: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LanguageProfile {
    pub language: Language,
    /// Tamil letters over (Tamil + ASCII letters). Zero when there are none.
    pub secondary_ratio: f32,
    pub primary_ratio: f32,
}

/// Classifies text as English or Tamil by script composition.
#[derive(Debug, Clone, Copy)]
pub struct LanguageIdentifier {
    threshold: f32,
}

impl Default for LanguageIdentifier {
    fn default() -> Self { Self::new(DEFAULT_SECONDARY_THRESHOLD) }
}

fn is_secondary(c: char) -> bool { SECONDARY_SCRIPT_RANGE.contains(&u32::from(c)) }

impl LanguageIdentifier {
    pub fn new(threshold: f32) -> Self { Self { threshold } }

    pub fn detect(&self, text: &str) -> Language { self.identify(text).language }

    pub fn identify(&self, text: &str) -> LanguageProfile {
        let (secondary, primary) = text.chars().fold((0usize, 0usize), |(s, p), c| {
            if is_secondary(c) {
                (s + 1, p)
            } else if c.is_ascii_alphabetic() {
                (s, p + 1)
            } else {
                (s, p)
            }
        });
        let total = secondary + primary;
        if total == 0 {
            return LanguageProfile { language: Language::English, secondary_ratio: 0.0, primary_ratio: 0.0 };
        }
        let secondary_ratio = secondary as f32 / total as f32;
        let primary_ratio = primary as f32 / total as f32;
        let language = if secondary_ratio > self.threshold { Language::Tamil } else { Language::English };
        LanguageProfile { language, secondary_ratio, primary_ratio }
    }

    pub fn contains_secondary_script(&self, text: &str) -> bool { text.chars().any(is_secondary) }
}
