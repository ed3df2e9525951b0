//! Filter evaluation: decide whether a message passes a target's rules.
//!
//! Evaluation fails open. Ambiguous language detection, too-short text and any
//! panic inside evaluation all count as a pass, so a filtering bug can never
//! silently starve the relay path.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use tracing::error;

use crate::domain::{FilterRule, MediaCategory};

pub mod input;
pub mod language;

pub use input::{parse_filter_args, validate_filter_input, FilterInput, SUPPORTED_LANGUAGES};
pub use language::{LanguageDetector, WhatlangDetector};

/// Below this many characters the language dimension is always satisfied.
pub const DEFAULT_LANGUAGE_MIN_CHARS: usize = 10;
/// Detector input is cut to this many characters.
pub const DEFAULT_LANGUAGE_MAX_CHARS: usize = 2000;

#[derive(Clone)]
pub struct FilterEvaluator {
    detector: Arc<dyn LanguageDetector>,
    min_chars: usize,
    max_chars: usize,
}

impl Default for FilterEvaluator {
    fn default() -> Self {
        Self::new(
            Arc::new(WhatlangDetector),
            DEFAULT_LANGUAGE_MIN_CHARS,
            DEFAULT_LANGUAGE_MAX_CHARS,
        )
    }
}

impl FilterEvaluator {
    pub fn new(detector: Arc<dyn LanguageDetector>, min_chars: usize, max_chars: usize) -> Self {
        Self {
            detector,
            min_chars,
            max_chars: max_chars.max(min_chars),
        }
    }

    /// Forward/drop decision for one message against one rule set.
    pub fn evaluate(&self, text: &str, media: MediaCategory, rule: Option<&FilterRule>) -> bool {
        let Some(rule) = rule else {
            return true;
        };
        if rule.is_empty() {
            return true;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.evaluate_rule(text, media, rule))) {
            Ok(pass) => pass,
            Err(_) => {
                error!(media = %media, "filter evaluation panicked; letting message through");
                true
            }
        }
    }

    fn evaluate_rule(&self, text: &str, media: MediaCategory, rule: &FilterRule) -> bool {
        if let Some(keywords) = &rule.keywords {
            if !matches_keywords(text, keywords) {
                return false;
            }
        }
        if let Some(language) = &rule.language {
            if !self.matches_language(text, language) {
                return false;
            }
        }
        if let Some(allowed) = &rule.media_types {
            if !matches_media(media, allowed) {
                return false;
            }
        }
        true
    }

    /// Language dimension. Short text and failed detection both pass.
    pub fn matches_language(&self, text: &str, language: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.min_chars {
            return true;
        }

        let sample: String = trimmed.chars().take(self.max_chars).collect();
        match self.detector.detect(&sample) {
            Some(detected) => detected.eq_ignore_ascii_case(language.trim()),
            None => true,
        }
    }
}

/// Keyword dimension: any normalized keyword is a substring of the lower-cased text.
pub fn matches_keywords(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    if text.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .any(|k| haystack.contains(&k))
}

/// Media dimension: the message's category is one of the allowed ones.
pub fn matches_media(media: MediaCategory, allowed: &[MediaCategory]) -> bool {
    allowed.is_empty() || allowed.contains(&media)
}
