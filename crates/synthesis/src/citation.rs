//! Citation annotation for generated answers.
//!
//! [`TitleMatchAnnotator`] appends a `References:` block listing every
//! candidate whose title appears (case-insensitively) in the text.

use papertrail_core::{CitationReference, PaperRecord};

/// Separator placed between the generated text and its reference block.
pub const REFERENCES_HEADER: &str = "\n\nReferences:\n";

/// Post-processes generated text against the records it was generated from.
pub trait CitationAnnotator: Send + Sync {
    fn annotate(&self, text: &str, candidates: &[PaperRecord]) -> String;
}

/// Case-insensitive substring match of candidate titles.
///
/// A trailing reference block made only of rendered candidate references is
/// treated as a previous annotation: it is excluded from the search and
/// replaced, so annotating twice changes nothing. Any other text, including a
/// `References:` section the model wrote itself, is searched and kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleMatchAnnotator;

impl TitleMatchAnnotator {
    /// References for every candidate mentioned in `text`, in candidate
    /// order, one per distinct title.
    pub fn matches(&self, text: &str, candidates: &[PaperRecord]) -> Vec<CitationReference> {
        let haystack = body(text, candidates).to_lowercase();
        let mut seen: Vec<String> = Vec::new();
        let mut refs = Vec::new();

        for candidate in candidates {
            let needle = candidate.title.trim().to_lowercase();
            if needle.is_empty() || seen.contains(&needle) || !haystack.contains(&needle) {
                continue;
            }
            seen.push(needle);
            refs.push(CitationReference::from(candidate));
        }
        refs
    }
}

impl CitationAnnotator for TitleMatchAnnotator {
    fn annotate(&self, text: &str, candidates: &[PaperRecord]) -> String {
        let refs = self.matches(text, candidates);
        if refs.is_empty() {
            return text.to_string();
        }

        let lines: Vec<String> = refs.iter().map(ToString::to_string).collect();
        format!("{}{REFERENCES_HEADER}{}", body(text, candidates), lines.join("\n"))
    }
}

/// `text` without a trailing block previously appended for `candidates`.
fn body<'a>(text: &'a str, candidates: &[PaperRecord]) -> &'a str {
    let Some(idx) = text.rfind(REFERENCES_HEADER) else {
        return text;
    };

    let rendered: Vec<String> = candidates
        .iter()
        .map(|c| CitationReference::from(c).to_string())
        .collect();
    let block = &text[idx + REFERENCES_HEADER.len()..];
    let ours = !block.is_empty() && block.split('\n').all(|line| rendered.iter().any(|r| r == line));

    if ours { &text[..idx] } else { text }
}
