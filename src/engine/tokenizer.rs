//! Sentence tokenization.
//!
//! The tokenizer is the first stage of the pipeline: it turns a raw sentence
//! into the ordered `Token` sequence the matcher consumes. The scan is
//! intentionally simple:
//!
//! - word tokens are maximal runs of alphanumeric characters (plus internal
//!   apostrophes and hyphens), found with a single regex pass;
//! - any other non-whitespace character becomes a one-character token, so
//!   punctuation stays addressable by rules instead of being dropped.
//!
//! Normalization is lowercasing only. Rules match against the normalized
//! form; the original slice and byte span are kept so callers can map
//! results back to the input.

/// A unit of the input sentence. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Position index within the token sequence.
    pub index: usize,
    /// Start byte offset in the original sentence.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Original text slice.
    pub text: String,
    /// Normalized (lowercased) form, the form rules match against.
    pub norm: String,
}

/// Split `input` into an ordered sequence of tokens.
pub fn tokenize(input: &str) -> Vec<Token> {
    let word = regex!(r"[\p{Alphabetic}\p{N}][\p{Alphabetic}\p{N}'’-]*");

    let mut tokens = Vec::new();
    let mut cursor = 0;
    for m in word.find_iter(input) {
        push_marks(input, cursor, m.start(), &mut tokens);
        push_token(input, m.start(), m.end(), &mut tokens);
        cursor = m.end();
    }
    push_marks(input, cursor, input.len(), &mut tokens);
    tokens
}

fn push_token(input: &str, start: usize, end: usize, tokens: &mut Vec<Token>) {
    let text = input[start..end].to_string();
    tokens.push(Token { index: tokens.len(), start, end, norm: text.to_lowercase(), text });
}

/// Emit every non-whitespace character in `input[from..to]` as its own token.
fn push_marks(input: &str, from: usize, to: usize, tokens: &mut Vec<Token>) {
    for (offset, ch) in input[from..to].char_indices() {
        if ch.is_whitespace() {
            continue;
        }
        let start = from + offset;
        push_token(input, start, start + ch.len_utf8(), tokens);
    }
}
