//! Message chunking
//!
//! Splits long outbound text into chunks that fit the chat platform limit.
//! Each cut is chosen by walking an ordered chain of [`SplitStrategy`]
//! values: paragraph break, line break, sentence end, word boundary and
//! finally a hard cut. A candidate only qualifies when it lies beyond 30% of
//! the limit, so chunks never become tiny slivers.
//!
//! Lengths are measured in characters, never bytes.

use crate::config::DEFAULT_MAX_MESSAGE_LENGTH;
use serde::{Deserialize, Serialize};

/// Fraction of the limit a cut position must exceed
pub const DEFAULT_THRESHOLD_RATIO: f64 = 0.3;

/// Sentence terminators, cut after the punctuation mark
const SENTENCE_ENDINGS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

/// One way of choosing a cut position inside the search window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SplitStrategy {
    /// Cut before the last occurrence of a literal delimiter
    Delimiter(String),
    /// Cut after the furthest sentence terminator
    SentenceEnd,
    /// Cut before the last space
    WordBoundary,
    /// Cut at exactly the limit
    HardCut,
}

impl SplitStrategy {
    /// Byte offset to cut `window` at, if this strategy finds one beyond
    /// `threshold` characters. `limit` is the window length in characters.
    fn find_cut(&self, window: &str, threshold: usize, limit: usize) -> Option<usize> {
        match self {
            SplitStrategy::Delimiter(delimiter) => {
                if delimiter.is_empty() {
                    return None;
                }
                window
                    .rfind(delimiter.as_str())
                    .filter(|&pos| char_position(window, pos) > threshold)
            }
            SplitStrategy::SentenceEnd => SENTENCE_ENDINGS
                .iter()
                .filter_map(|ending| window.rfind(*ending))
                .filter(|&pos| char_position(window, pos) > threshold)
                .max()
                // keep the punctuation mark (always one ASCII byte) in the chunk
                .map(|pos| pos + 1),
            SplitStrategy::WordBoundary => window
                .rfind(' ')
                .filter(|&pos| char_position(window, pos) > threshold),
            SplitStrategy::HardCut => Some(byte_offset(window, limit)),
        }
    }
}

/// Table-driven chunking policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingPolicy {
    /// Maximum characters per chunk
    pub max_length: usize,
    /// Cut positions must lie beyond `floor(max_length * threshold_ratio)`
    pub threshold_ratio: f64,
    /// Strategies tried in order for each cut
    pub strategies: Vec<SplitStrategy>,
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_LENGTH)
    }
}

impl ChunkingPolicy {
    /// Standard strategy chain for the given limit. A limit of 0 is treated as 1.
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            threshold_ratio: DEFAULT_THRESHOLD_RATIO,
            strategies: vec![
                SplitStrategy::Delimiter("\n\n".to_string()),
                SplitStrategy::Delimiter("\n".to_string()),
                SplitStrategy::SentenceEnd,
                SplitStrategy::WordBoundary,
                SplitStrategy::HardCut,
            ],
        }
    }

    fn threshold(&self) -> usize {
        (self.max_length as f64 * self.threshold_ratio).floor() as usize
    }

    /// Split `message` into trimmed, non-empty chunks of at most `max_length`
    /// characters, in reading order.
    pub fn split(&self, message: &str) -> Vec<String> {
        let limit = self.max_length.max(1);
        let threshold = self.threshold();

        let mut remaining = message.trim();
        if remaining.is_empty() {
            return Vec::new();
        }
        if remaining.chars().count() <= limit {
            return vec![remaining.to_string()];
        }

        let mut chunks = Vec::new();
        while !remaining.is_empty() {
            if remaining.chars().count() <= limit {
                chunks.push(remaining.to_string());
                break;
            }

            let window = &remaining[..byte_offset(remaining, limit)];
            let cut = self
                .strategies
                .iter()
                .find_map(|strategy| strategy.find_cut(window, threshold, limit))
                .filter(|&cut| cut > 0)
                .unwrap_or(window.len());

            let chunk = remaining[..cut].trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            remaining = remaining[cut..].trim();
        }

        chunks
    }
}

/// Split a message with the standard chain and the given limit
pub fn split(message: &str, max_length: usize) -> Vec<String> {
    ChunkingPolicy::new(max_length).split(message)
}

/// Split a message at the default 4096-character limit
pub fn split_default(message: &str) -> Vec<String> {
    ChunkingPolicy::default().split(message)
}

/// Byte offset of the `chars`-th character (or the end of the string)
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// Character index of a byte offset that lies on a char boundary
fn char_position(text: &str, byte_pos: usize) -> usize {
    text[..byte_pos].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_short_message_is_single_trimmed_chunk() {
        assert_eq!(split("  hello world \n", 4096), vec!["hello world"]);
    }

    #[test]
    fn test_empty_message_has_no_chunks() {
        assert!(split("", 4096).is_empty());
        assert!(split(" \n\n ", 4096).is_empty());
    }

    #[test]
    fn test_hard_cut_without_delimiters() {
        let message = "a".repeat(10_000);
        let chunks = split(&message, 4096);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 4096);
        assert_eq!(chunks[2].len(), 10_000 - 2 * 4096);
    }

    #[test]
    fn test_paragraph_break_preferred() {
        let first = "x".repeat(3000);
        let second = "y".repeat(1998);
        let message = format!("{first}\n\n{second}");
        assert_eq!(message.len(), 5000);

        let chunks = split(&message, 4096);
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn test_paragraph_before_threshold_is_ignored() {
        // "\n\n" at position 2 is below threshold (3), so the space wins
        let chunks = split("ab\n\ncd efgh ij", 10);
        assert_eq!(chunks, vec!["ab\n\ncd", "efgh ij"]);
    }

    #[test]
    fn test_line_break_beats_sentence_end() {
        let chunks = split("Hello there. More\ntext follows here", 20);
        assert_eq!(chunks[0], "Hello there. More");
    }

    #[test]
    fn test_sentence_end_keeps_punctuation() {
        let chunks = split("One two three. Four five! Six seven", 30);
        assert_eq!(chunks, vec!["One two three. Four five!", "Six seven"]);
    }

    #[test]
    fn test_furthest_sentence_end_wins_across_patterns() {
        let chunks = split("Is it? Yes it is. Right! then more words", 26);
        assert_eq!(chunks[0], "Is it? Yes it is. Right!");
    }

    #[test]
    fn test_word_boundary_fallback() {
        let chunks = split("alpha beta gamma delta", 12);
        assert_eq!(chunks, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let message = "é".repeat(25);
        let chunks = split(&message, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), message);
    }

    #[test]
    fn test_zero_limit_treated_as_one() {
        assert_eq!(split("abc", 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_chunk_resplit_is_stable() {
        let message = "word ".repeat(2000);
        let chunks = split_default(&message);
        assert!(chunks.len() > 1);
        assert_eq!(split_default(&chunks[0]), vec![chunks[0].clone()]);
    }

    fn words_of(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    proptest! {
        #[test]
        fn prop_chunks_bounded_and_non_empty(
            message in "[a-zA-Z .!?\n]{0,600}",
            max_length in 1usize..120,
        ) {
            let chunks = split(&message, max_length);
            for chunk in &chunks {
                prop_assert!(!chunk.is_empty());
                prop_assert!(chunk.chars().count() <= max_length);
                prop_assert_eq!(chunk.trim(), chunk.as_str());
            }
        }

        #[test]
        fn prop_words_preserved_in_order(
            words in prop::collection::vec("[a-z]{1,8}[.!?]?", 0..200),
            separators in prop::collection::vec(prop_oneof![Just(" "), Just("\n"), Just("\n\n")], 200),
            max_length in 20usize..200,
        ) {
            let message: String = words
                .iter()
                .zip(separators.iter())
                .map(|(word, sep)| format!("{word}{sep}"))
                .collect();
            let chunks = split(&message, max_length);
            prop_assert_eq!(words_of(&chunks.join(" ")), words_of(&message));
        }

        #[test]
        fn prop_short_messages_round_trip(message in "[a-z \n]{0,100}") {
            let chunks = split(&message, 4096);
            let trimmed = message.trim();
            if trimmed.is_empty() {
                prop_assert!(chunks.is_empty());
            } else {
                prop_assert_eq!(chunks, vec![trimmed.to_string()]);
            }
        }
    }
}
