//! Turning token display strings back into readable text.
//!
//! Each vocabulary family marks word boundaries its own way. These rules only
//! affect what is printed; generation never sees them.

use serde::{Deserialize, Serialize};

use crate::service::Vocabulary;

/// Spacing repairs for word-level WikiText vocabularies, applied in order.
pub const WIKITEXT_REWRITES: [(&str, &str); 10] = [
    (" @-@ ", "-"),
    (" @,@ ", ","),
    (" @.@ ", "."),
    (" . ", ". "),
    (" , ", ", "),
    (" : ", ": "),
    (" ; ", "; "),
    (" 's ", "'s "),
    (" ( ", " ("),
    (" ) ", ") "),
];

pub const DEFAULT_END_MARKER: &str = "<eos>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetokScheme {
    /// Byte-level BPE: `Ġ` marks a leading space, `Ċ` a newline.
    ByteLevel,
    /// Word-end BPE: `</w>` closes a word.
    WordEnd,
    /// Whitespace-separated words with WikiText punctuation spacing.
    WikiText,
}

impl DetokScheme {
    /// Guess the scheme from marker tokens present in the vocabulary.
    pub fn detect<V: Vocabulary + ?Sized>(vocab: &V) -> Self {
        if ["Ġ", "Ġthe"].iter().any(|t| vocab.token_to_id(t).is_some()) {
            DetokScheme::ByteLevel
        } else if ["the</w>", ".</w>"].iter().any(|t| vocab.token_to_id(t).is_some()) {
            DetokScheme::WordEnd
        } else {
            DetokScheme::WikiText
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detokenizer {
    pub scheme: DetokScheme,
    /// Token rendered as a line break.
    pub end_marker: Option<String>,
}

impl Detokenizer {
    pub fn new(scheme: DetokScheme) -> Self {
        let end_marker = match scheme {
            DetokScheme::WikiText => Some(DEFAULT_END_MARKER.to_string()),
            _ => None,
        };
        Self { scheme, end_marker }
    }

    pub fn with_end_marker(mut self, marker: impl Into<String>) -> Self {
        self.end_marker = Some(marker.into());
        self
    }

    fn is_end(&self, symbol: &str) -> bool {
        self.end_marker.as_deref() == Some(symbol)
    }

    pub fn render<S: AsRef<str>>(&self, symbols: &[S]) -> String {
        match self.scheme {
            DetokScheme::ByteLevel => self
                .concat(symbols)
                .replace('Ġ', " ")
                .replace('Ċ', "\r\n"),
            DetokScheme::WordEnd => self.concat(symbols).replace("</w>", " "),
            DetokScheme::WikiText => {
                let mut line = String::new();
                for symbol in symbols {
                    let symbol = symbol.as_ref();
                    if self.is_end(symbol) {
                        line.push('\n');
                    } else {
                        line.push_str(symbol);
                        line.push(' ');
                    }
                }
                rewrite_wikitext(&line)
            }
        }
    }

    fn concat<S: AsRef<str>>(&self, symbols: &[S]) -> String {
        let mut text = String::new();
        for symbol in symbols {
            let symbol = symbol.as_ref();
            if self.is_end(symbol) {
                text.push('\n');
            } else {
                text.push_str(symbol);
            }
        }
        text
    }
}

/// Apply [`WIKITEXT_REWRITES`] until none of them matches.
///
/// Every rule shortens the text, so this terminates, and the result is a
/// fixed point: running it again changes nothing.
pub fn rewrite_wikitext(text: &str) -> String {
    let mut line = text.to_string();
    loop {
        let before = line.len();
        for (from, to) in WIKITEXT_REWRITES {
            while line.contains(from) {
                line = line.replace(from, to);
            }
        }
        if line.len() == before {
            return line;
        }
    }
}
