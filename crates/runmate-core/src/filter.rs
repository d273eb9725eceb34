//! Profanity masking for user-submitted review comments.

use regex::{Regex, RegexBuilder};

use crate::CoreError;

const DEFAULT_WORDS: &[&str] = &[
    "arse", "ass", "asshole", "bastard", "bitch", "bollocks", "bullshit", "crap", "cunt", "damn",
    "dick", "douche", "fag", "fuck", "fucker", "fucking", "goddamn", "hell", "motherfucker",
    "piss", "prick", "pussy", "shit", "shitty", "slut", "twat", "wanker", "whore",
];

/// Replaces listed words with asterisks of the same length.
///
/// Matching is case-insensitive and respects word boundaries, so "class" is
/// left alone while "ASS" is masked. Build once at startup and share.
#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    pattern: Regex,
}

impl ProfanityFilter {
    /// Builds a filter over the built-in word list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Filter`] if the pattern cannot be compiled.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_words(DEFAULT_WORDS.iter().copied())
    }

    /// Builds a filter over a custom word list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Filter`] if the list is empty or the pattern
    /// cannot be compiled.
    pub fn with_words<'a, I>(words: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let alternation = words
            .into_iter()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Err(CoreError::Filter("word list is empty".to_string()));
        }
        let pattern = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
            .case_insensitive(true)
            .build()
            .map_err(|e| CoreError::Filter(e.to_string()))?;
        Ok(Self { pattern })
    }

    #[must_use]
    pub fn clean(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                "*".repeat(caps[0].chars().count())
            })
            .into_owned()
    }
}
