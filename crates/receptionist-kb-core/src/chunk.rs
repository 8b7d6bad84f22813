//! Sentence-boundary text chunker.
//!
//! Splits document text into chunks bounded by a word budget. Splitting
//! happens only between sentences, so a sentence is never cut in half.
//!
//! # Algorithm
//!
//! 1. Split on sentence boundaries: `.`, `?` or `!` followed by whitespace.
//! 2. Accumulate sentences into a buffer until adding the next one would
//!    push the buffer past `max_words`.
//! 3. When exceeded, flush the buffer as a chunk and start a new one with
//!    the sentence that did not fit.
//! 4. A single sentence longer than `max_words` becomes its own chunk.
//!
//! Sentences inside a chunk are joined by one space; whitespace between
//! sentences is not preserved.
//!
//! # Example
//!
//! ```rust
//! use receptionist_kb_core::chunk::chunk_text;
//!
//! assert_eq!(chunk_text("A. B. C.", 500), vec!["A. B. C."]);
//! assert_eq!(chunk_text("A. B. C.", 1), vec!["A.", "B.", "C."]);
//! ```

/// Default word budget per chunk.
pub const DEFAULT_MAX_WORDS: usize = 500;

/// Split text into chunks on sentence boundaries, respecting `max_words`.
///
/// A `max_words` of `0` is treated as `1`, which yields one sentence per
/// chunk.
///
/// # Guarantees
///
/// - Every sentence appears in exactly one chunk, in input order.
/// - No chunk is empty; whitespace-only input yields no chunks.
/// - Joining the chunks with spaces reproduces the input's words.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_words = 0usize;

    for sentence in split_sentences(text) {
        let words = word_count(sentence);

        if current_words > 0 && current_words + words > max_words {
            chunks.push(std::mem::take(&mut current));
            current_words = 0;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
        current_words += words;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split text into trimmed sentences.
///
/// A boundary is a `.`, `?` or `!` immediately followed by whitespace.
/// Trailing text without terminal punctuation forms a final sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '?' | '!') {
            continue;
        }
        let followed_by_space = chars.peek().is_some_and(|&(_, next)| next.is_whitespace());
        if followed_by_space {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_all_sentences_fit() {
        assert_eq!(chunk_text("A. B. C.", 100), vec!["A. B. C."]);
    }

    #[test]
    fn test_one_word_budget_splits_every_sentence() {
        assert_eq!(chunk_text("A. B. C.", 1), vec!["A.", "B.", "C."]);
    }

    #[test]
    fn test_zero_budget_behaves_like_one() {
        assert_eq!(chunk_text("A. B.", 0), vec!["A.", "B."]);
    }

    #[test]
    fn test_empty_and_blank_text() {
        assert!(chunk_text("", 10).is_empty());
        assert!(chunk_text("   \n\t ", 10).is_empty());
    }

    #[test]
    fn test_question_and_exclamation_boundaries() {
        let s = split_sentences("Open today? Yes! We close at five.");
        assert_eq!(s, vec!["Open today?", "Yes!", "We close at five."]);
    }

    #[test]
    fn test_punctuation_without_space_is_not_a_boundary() {
        let s = split_sentences("Visit example.com for hours. Thanks");
        assert_eq!(s, vec!["Visit example.com for hours.", "Thanks"]);
    }

    #[test]
    fn test_oversized_sentence_is_its_own_chunk() {
        let text = "One two three four five six. Short one.";
        let chunks = chunk_text(text, 3);
        assert_eq!(chunks, vec!["One two three four five six.", "Short one."]);
    }

    #[test]
    fn test_oversized_first_sentence_produces_no_empty_chunk() {
        let chunks = chunk_text("Alpha beta gamma delta. Epsilon.", 2);
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_accumulates_until_budget() {
        let text = "One two. Three four. Five six. Seven eight.";
        let chunks = chunk_text(text, 4);
        assert_eq!(chunks, vec!["One two. Three four.", "Five six. Seven eight."]);
    }

    #[test]
    fn test_coverage_no_drop_no_duplicate() {
        let text = "Our hours are 9 to 5.  We are closed Sundays.\n\nCall us at any time! \
                    Do you deliver? We do, within ten miles. Parking is free";
        for budget in [1, 2, 5, 8, 13, 100] {
            let chunks = chunk_text(text, budget);
            let joined = chunks.join(" ");
            assert_eq!(words(&joined), words(text), "budget {budget}");
            for c in &chunks {
                assert!(!c.is_empty());
            }
        }
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Café ouvert. Überall geschlossen! 営業中です. fin";
        let chunks = chunk_text(text, 2);
        assert_eq!(words(&chunks.join(" ")), words(text));
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha. Beta gamma. Delta epsilon zeta. Eta.";
        assert_eq!(chunk_text(text, 3), chunk_text(text, 3));
    }
}
