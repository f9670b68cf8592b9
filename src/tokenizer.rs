//! Tokenization and n-gram enumeration over token sequences.

use regex::Regex;
use std::collections::HashMap;

/// Pattern for CBETA-style texts: every word character is a token, as is
/// any square-bracketed expression.
pub const PATTERN_CBETA: &str = r"\w|\[[^\]]*\]";
pub const JOINER_CBETA: &str = "";

/// Pattern for space-delimited texts.
pub const PATTERN_PAGEL: &str = r"[\w'\-]+";
pub const JOINER_PAGEL: &str = " ";

/// Splits text into tokens and joins tokens back into canonical text.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
    joiner: String,
}

impl Tokenizer {
    pub fn new(pattern: &str, joiner: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            joiner: joiner.into(),
        })
    }

    /// Look up a named preset (`cbeta` or `pagel`).
    pub fn preset(name: &str) -> Option<Self> {
        let (pattern, joiner) = match name {
            "cbeta" => (PATTERN_CBETA, JOINER_CBETA),
            "pagel" => (PATTERN_PAGEL, JOINER_PAGEL),
            _ => return None,
        };
        Self::new(pattern, joiner).ok()
    }

    pub fn cbeta() -> Self {
        Self {
            pattern: Regex::new(PATTERN_CBETA).expect("static pattern"),
            joiner: JOINER_CBETA.to_string(),
        }
    }

    pub fn pagel() -> Self {
        Self {
            pattern: Regex::new(PATTERN_PAGEL).expect("static pattern"),
            joiner: JOINER_PAGEL.to_string(),
        }
    }

    pub fn joiner(&self) -> &str {
        &self.joiner
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn join<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        let mut joined = String::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                joined.push_str(&self.joiner);
            }
            joined.push_str(token.as_ref());
        }
        joined
    }

    /// Number of tokens in `text`.
    pub fn size_of(&self, text: &str) -> usize {
        self.pattern.find_iter(text).count()
    }
}

/// Count every n-gram of `size` tokens in `tokens`.
pub fn count_ngrams(tokens: &[String], size: usize) -> HashMap<&[String], u64> {
    let mut counts: HashMap<&[String], u64> = HashMap::new();
    if size == 0 || tokens.len() < size {
        return counts;
    }
    for window in tokens.windows(size) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

/// All proper contiguous sub-sequences of `tokens`, with multiplicity,
/// largest first.
///
/// A trigram yields two bigrams and three unigrams.
pub fn proper_substrings(tokens: &[String]) -> impl Iterator<Item = &[String]> {
    (1..tokens.len()).rev().flat_map(move |size| tokens.windows(size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pagel_tokenize_and_join() {
        let tokenizer = Tokenizer::pagel();
        let toks = tokenizer.tokenize("the king's  horse, ran-off.");
        assert_eq!(toks, tokens(&["the", "king's", "horse", "ran-off"]));
        assert_eq!(tokenizer.join(&toks), "the king's horse ran-off");
    }

    #[test]
    fn test_cbeta_characters_and_brackets() {
        let tokenizer = Tokenizer::cbeta();
        let toks = tokenizer.tokenize("如是[我/聞]，一時");
        assert_eq!(toks, tokens(&["如", "是", "[我/聞]", "一", "時"]));
        assert_eq!(tokenizer.join(&toks), "如是[我/聞]一時");
    }

    #[test]
    fn test_join_is_inverse_of_tokenize() {
        for tokenizer in [Tokenizer::cbeta(), Tokenizer::pagel()] {
            let toks = tokenizer.tokenize("阿難 said: 如是我聞 [note] again");
            let joined = tokenizer.join(&toks);
            assert_eq!(tokenizer.tokenize(&joined), toks);
        }
    }

    #[test]
    fn test_preset_lookup() {
        assert!(Tokenizer::preset("cbeta").is_some());
        assert_eq!(Tokenizer::preset("pagel").unwrap().joiner(), " ");
        assert!(Tokenizer::preset("unknown").is_none());
    }

    #[test]
    fn test_size_of() {
        assert_eq!(Tokenizer::pagel().size_of("a b c"), 3);
        assert_eq!(Tokenizer::cbeta().size_of("abc"), 3);
        assert_eq!(Tokenizer::pagel().size_of(""), 0);
    }

    #[test]
    fn test_count_ngrams() {
        let toks = tokens(&["a", "b", "a", "b", "a"]);
        let counts = count_ngrams(&toks, 2);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&toks[0..2]], 2);
        assert_eq!(counts[&toks[1..3]], 2);
        assert!(count_ngrams(&toks, 6).is_empty());
        assert!(count_ngrams(&toks, 0).is_empty());
    }

    #[test]
    fn test_proper_substrings_multiplicity() {
        let toks = tokens(&["a", "b", "c"]);
        let subs: Vec<&[String]> = proper_substrings(&toks).collect();
        assert_eq!(subs.len(), 5);
        assert_eq!(subs[0], &toks[0..2]);
        assert_eq!(subs[1], &toks[1..3]);
        assert_eq!(subs[2..].iter().filter(|s| s.len() == 1).count(), 3);
        assert_eq!(proper_substrings(&toks[..1]).count(), 0);
    }
}
