//! Tokenizer implementations behind the core `Tokenizer` seam.

use std::path::Path;

use passagedb_core::error::{Error, Result};
use passagedb_core::traits::{TokenSpan, Tokenizer};

/// Whitespace segmentation with exact byte offsets. Fully deterministic and
/// dependency-free; the default for corpora without a tokenizer file and
/// for tests.
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn spans(&self, text: &str) -> Result<Vec<TokenSpan>> {
        let mut spans = Vec::new();
        let mut start: Option<usize> = None;
        for (i, ch) in text.char_indices() {
            if ch.is_whitespace() {
                if let Some(s) = start.take() {
                    spans.push(TokenSpan { start: s, end: i });
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            spans.push(TokenSpan { start: s, end: text.len() });
        }
        Ok(spans)
    }
}

/// Wrapper over a HuggingFace `tokenizers` tokenizer loaded from a
/// `tokenizer.json`. Offsets come from the encoding's offset mapping and
/// are validated against the input before use.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            Error::integrity(format!("failed to load tokenizer {}: {}", path.display(), e))
        })?;
        Ok(Self { inner })
    }
}

impl Tokenizer for HfTokenizer {
    fn spans(&self, text: &str) -> Result<Vec<TokenSpan>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| Error::ChunkAlignment(format!("tokenization failed: {e}")))?;
        validate_offsets(text, encoding.get_offsets())
    }
}

/// Turn raw `(start, end)` offsets into validated spans. Zero-width spans
/// (special tokens) are dropped; out-of-bounds, overlapping, or
/// non-char-boundary offsets mean the mapping cannot be trusted for chunk
/// boundary derivation and fail with `ChunkAlignment`.
pub fn validate_offsets(text: &str, offsets: &[(usize, usize)]) -> Result<Vec<TokenSpan>> {
    let mut spans = Vec::with_capacity(offsets.len());
    let mut prev_end = 0usize;
    for &(start, end) in offsets {
        if start == end {
            continue;
        }
        if start > end || end > text.len() {
            return Err(Error::ChunkAlignment(format!(
                "token span {start}..{end} is outside text of {} bytes",
                text.len()
            )));
        }
        if start < prev_end {
            return Err(Error::ChunkAlignment(format!(
                "token span {start}..{end} overlaps the previous token ending at {prev_end}"
            )));
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(Error::ChunkAlignment(format!(
                "token span {start}..{end} does not fall on char boundaries"
            )));
        }
        prev_end = end;
        spans.push(TokenSpan { start, end });
    }
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_spans_are_exact() {
        let text = "  alpha beta\n gamma ";
        let spans = WhitespaceTokenizer.spans(text).expect("spans");
        let tokens: Vec<&str> = spans.iter().map(|s| &text[s.start..s.end]).collect();
        assert_eq!(tokens, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn whitespace_handles_multibyte() {
        let text = "caf\u{e9} th\u{e9}";
        let spans = WhitespaceTokenizer.spans(text).expect("spans");
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].start..spans[0].end], "caf\u{e9}");
        assert_eq!(&text[spans[1].start..spans[1].end], "th\u{e9}");
    }

    #[test]
    fn offset_validation_accepts_clean_mappings() {
        let text = "one two";
        let spans = validate_offsets(text, &[(0, 3), (3, 3), (4, 7)]).expect("spans");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1], TokenSpan { start: 4, end: 7 });
    }

    #[test]
    fn offset_validation_rejects_bad_mappings() {
        let text = "one two";
        assert!(matches!(
            validate_offsets(text, &[(0, 99)]),
            Err(Error::ChunkAlignment(_))
        ));
        assert!(matches!(
            validate_offsets(text, &[(0, 4), (2, 6)]),
            Err(Error::ChunkAlignment(_))
        ));
        let multibyte = "\u{e9}x";
        assert!(matches!(
            validate_offsets(multibyte, &[(1, 2)]),
            Err(Error::ChunkAlignment(_))
        ));
    }
}
