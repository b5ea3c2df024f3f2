//! Regex extractors that recover argument types the upstream relation model
//! systematically misses.
//!
//! An extractor matches a literal (e.g. a share count) and keeps the match
//! only if every context pattern occurs in a short window of text right
//! before it. Offsets are reported in characters, like entity spans.

use regex::Regex;
use std::sync::OnceLock;

use crate::Span;

#[derive(Debug, Clone)]
pub struct PatternExtractor {
    /// Argument type assigned to matches.
    pub role: String,
    pub regex: Regex,
    /// Number of characters before the match searched for context.
    pub window: usize,
    /// All of these must occur in the window.
    pub required_context: Vec<Regex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub span: Span,
    pub text: String,
}

impl PatternExtractor {
    pub fn find(&self, text: &str) -> Vec<PatternMatch> {
        let char_starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        let to_char = |byte: usize| char_starts.partition_point(|&b| b < byte);

        let mut matches = Vec::new();
        for m in self.regex.find_iter(text) {
            let start = to_char(m.start());
            let prefix_start = start.saturating_sub(self.window);
            let prefix_byte = char_starts.get(prefix_start).copied().unwrap_or(text.len());
            let prefix = &text[prefix_byte..m.start()];

            if self.required_context.iter().all(|ctx| ctx.is_match(prefix)) {
                matches.push(PatternMatch {
                    span: Span::new(start, to_char(m.end())),
                    text: m.as_str().to_string(),
                });
            }
        }
        matches
    }
}

/// Built-in extractors.
///
/// `TotalPledgedShares`: a share count (`1000股`) whose 15-character prefix
/// mentions both a total (`累计`, `合计`, ...) and a pledge (`质押`).
pub fn default_extractors() -> &'static [PatternExtractor] {
    static EXTRACTORS: OnceLock<Vec<PatternExtractor>> = OnceLock::new();
    EXTRACTORS.get_or_init(|| {
        vec![PatternExtractor {
            role: "TotalPledgedShares".to_string(),
            regex: Regex::new(r"\d+股").expect("static pattern"),
            window: 15,
            required_context: vec![
                Regex::new("总计|累积|共计|累计|总数|合计").expect("static pattern"),
                Regex::new("质押").expect("static pattern"),
            ],
        }]
    })
}
