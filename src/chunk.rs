//! Overlapping fixed-size text chunker.
//!
//! Splits extracted document text into [`Chunk`]s of at most `chunk_size`
//! characters, with the trailing `overlap` characters of each chunk repeated
//! at the start of the next one so context survives chunk boundaries. Split
//! points prefer whitespace near the size limit to avoid cutting words.
//!
//! Deterministic given identical input and parameters.

use crate::models::Chunk;

/// Split `text` into overlapping chunks attributed to `file_name`.
///
/// Character counts (not bytes) bound the chunk size, so multi-byte text is
/// never split mid-character. Whitespace-only input yields no chunks; chunk
/// indices are contiguous from 0.
///
/// Caller must guarantee `overlap < chunk_size` (enforced by config
/// validation); otherwise the loop could fail to advance.
pub fn chunk_text(file_name: &str, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    assert!(overlap < chunk_size, "overlap must be < chunk_size");

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let n = chars.len();
    let byte_at = |i: usize| if i < n { chars[i].0 } else { text.len() };

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index: i64 = 0;

    while start < n {
        let window_end = (start + chunk_size).min(n);
        let mut end = window_end;

        // Prefer the last whitespace inside the window, as long as it still
        // leaves room past the overlap region (otherwise no progress is made).
        if window_end < n {
            if let Some(pos) = (start..window_end).rev().find(|&i| chars[i].1.is_whitespace()) {
                if pos > start + overlap {
                    end = pos + 1;
                }
            }
        }

        let piece = text[byte_at(start)..byte_at(end)].trim();
        if !piece.is_empty() {
            chunks.push(Chunk {
                file_name: file_name.to_string(),
                chunk_index: index,
                text: piece.to_string(),
            });
            index += 1;
        }

        if end >= n {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_text_single_chunk() {
        let chunks = chunk_text("a.pdf", "Hello, world!", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].file_name, "a.pdf");
    }

    #[test]
    fn empty_and_whitespace_text_yield_no_chunks() {
        assert!(chunk_text("a.pdf", "", 1000, 200).is_empty());
        assert!(chunk_text("a.pdf", "   \n\n  ", 1000, 200).is_empty());
    }

    #[test]
    fn chunks_respect_max_size() {
        let text = "word ".repeat(500);
        let chunks = chunk_text("a.pdf", &text, 100, 20);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 100);
        }
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        // No whitespace, so splits are hard cuts: overlap is exact.
        let text: String = ('a'..='z').cycle().take(26).collect();
        let chunks = chunk_text("a.pdf", &text, 10, 3);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev: String = pair[0].text.chars().rev().take(3).collect::<Vec<_>>()
                .into_iter().rev().collect();
            assert!(pair[1].text.starts_with(&prev));
        }
    }

    #[test]
    fn indices_contiguous_from_zero() {
        let text = "alpha beta gamma delta ".repeat(50);
        let chunks = chunk_text("a.pdf", &text, 40, 10);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
    }

    #[test]
    fn deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(30);
        let a = chunk_text("a.pdf", &text, 120, 30);
        let b = chunk_text("a.pdf", &text, 120, 30);
        assert_eq!(a, b);
    }

    #[test]
    fn multibyte_text_never_panics() {
        let text = "héllo wörld ünïcode ".repeat(40);
        let chunks = chunk_text("a.pdf", &text, 50, 10);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.text.chars().count() <= 50);
        }
    }

    #[test]
    fn no_content_is_dropped() {
        let text = "one two three four five six seven eight nine ten ".repeat(20);
        let chunks = chunk_text("a.pdf", &text, 80, 20);
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        for word in ["one", "five", "ten"] {
            assert!(joined.contains(word));
        }
    }
}
