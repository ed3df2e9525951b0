//! Parsing and validation of `/setfilter` arguments.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{FilterRule, MediaCategory};

/// Language codes accepted by `/setfilter language:..`.
pub const SUPPORTED_LANGUAGES: [&str; 11] =
    ["en", "fa", "ar", "fr", "de", "es", "it", "ru", "zh", "ja", "ko"];

/// Raw filter parameters as typed by the user, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub keywords: Option<String>,
    pub language: Option<String>,
    pub media_types: Option<String>,
}

impl FilterInput {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_none() && self.language.is_none() && self.media_types.is_none()
    }

    pub fn validate(&self) -> Vec<String> {
        validate_filter_input(
            self.keywords.as_deref(),
            self.language.as_deref(),
            self.media_types.as_deref(),
        )
    }

    pub fn to_rule(&self) -> FilterRule {
        FilterRule::from_input(
            self.keywords.as_deref(),
            self.language.as_deref(),
            self.media_types.as_deref(),
        )
    }
}

fn keywords_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bkeywords?:([^,\s]+(?:,[^,\s]+)*)").expect("valid regex"))
}

fn language_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blang(?:uage)?:([^\s,]+)").expect("valid regex"))
}

fn media_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bmedia:([^,\s]+(?:,[^,\s]+)*)").expect("valid regex"))
}

/// Extract `keywords:a,b language:en media:photo,video` parameters.
///
/// Unrecognized tokens are ignored; the caller decides what an empty result means.
pub fn parse_filter_args(text: &str) -> FilterInput {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    FilterInput {
        keywords: capture(keywords_re()),
        language: capture(language_re()).map(|l| l.to_lowercase()),
        media_types: capture(media_re()),
    }
}

/// Human-readable validation errors; empty means the input is acceptable.
pub fn validate_filter_input(
    keywords: Option<&str>,
    language: Option<&str>,
    media_types: Option<&str>,
) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(k) = keywords {
        if k.split(',').all(|p| p.trim().is_empty()) {
            errors.push("Keywords must contain at least one non-empty word.".to_string());
        }
    }

    if let Some(lang) = language.map(str::trim).filter(|l| !l.is_empty()) {
        let lower = lang.to_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&lower.as_str()) {
            errors.push(format!(
                "Invalid language code: {lang}. Supported: {}",
                SUPPORTED_LANGUAGES.join(", ")
            ));
        }
    }

    if let Some(media) = media_types {
        let invalid: Vec<String> = media
            .split(',')
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .filter(|m| m.parse::<MediaCategory>().is_err())
            .collect();
        if !invalid.is_empty() {
            let supported = MediaCategory::ALL
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(format!(
                "Invalid media types: {}. Supported: {supported}",
                invalid.join(", ")
            ));
        }
    }

    errors
}
