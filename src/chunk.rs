//! Boundary-aware overlapping text chunker.
//!
//! Splits raw source text into windows of roughly `target_size` characters,
//! nudging each cut onto the nearest natural boundary so chunks do not end
//! mid-sentence. Consecutive chunks share `overlap` characters of
//! re-context so that the semantic content at a cut is retrievable from
//! either side.
//!
//! Boundary selection, in priority order:
//! 1. sentence-terminal punctuation (`.`, `!`, `?`) followed by whitespace,
//!    within 100 characters of the naive cut;
//! 2. a newline within 50 characters;
//! 3. any whitespace within 30 characters;
//! 4. the naive cut itself.
//!
//! All window arithmetic is done in characters, not bytes, so multi-byte
//! UTF-8 text never splits inside a code point.

/// How far a cut may drift from the naive boundary for each match class.
const SENTENCE_SLACK: usize = 100;
const NEWLINE_SLACK: usize = 50;
const WHITESPACE_SLACK: usize = 30;

/// Split `text` into an ordered sequence of overlapping substrings.
///
/// Returns a single-element sequence containing `text` whole when it fits in
/// one window. Otherwise every chunk is at most `target_size +
/// SENTENCE_SLACK` characters long, ordering equals a left-to-right
/// traversal of the input, and chunk start offsets increase strictly even
/// when `overlap >= target_size`.
pub fn chunk_text(text: &str, target_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total <= target_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let naive = start + target_size;
        if naive >= total {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let end = find_boundary(&chars, start, naive).max(start + 1);
        chunks.push(chars[start..end].iter().collect());

        if end >= total {
            break;
        }

        // Back up for re-context, but never stop advancing.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Pick the cut position for a window whose naive boundary is `naive`.
///
/// Probes outward from the naive boundary, preferring the forward candidate
/// at equal distance, and returns the index one past the boundary character
/// so the boundary itself stays in the emitted chunk.
fn find_boundary(chars: &[char], start: usize, naive: usize) -> usize {
    if let Some(pos) = nearest_match(chars, start, naive, SENTENCE_SLACK, is_sentence_end) {
        return pos + 1;
    }
    if let Some(pos) = nearest_match(chars, start, naive, NEWLINE_SLACK, |ch, _| ch == '\n') {
        return pos + 1;
    }
    if let Some(pos) = nearest_match(chars, start, naive, WHITESPACE_SLACK, |ch, _| {
        ch.is_whitespace()
    }) {
        return pos + 1;
    }
    naive
}

/// Sentence-terminal punctuation followed by whitespace.
fn is_sentence_end(ch: char, next: Option<char>) -> bool {
    matches!(ch, '.' | '!' | '?') && next.is_some_and(|n| n.is_whitespace())
}

/// Find the position nearest to `naive` (within `slack` characters, inside
/// the current window) whose character satisfies `pred`.
fn nearest_match<F>(chars: &[char], start: usize, naive: usize, slack: usize, pred: F) -> Option<usize>
where
    F: Fn(char, Option<char>) -> bool,
{
    let total = chars.len();
    let hit = |pos: usize| pred(chars[pos], chars.get(pos + 1).copied());
    for dist in 0..=slack {
        // Forward candidate first, then backward, so ties resolve toward
        // longer chunks (bounded by the testable `target_size + 100` slack).
        let fwd = naive + dist;
        if fwd < total && hit(fwd) {
            return Some(fwd);
        }
        if dist > 0 && naive >= dist {
            let back = naive - dist;
            if back > start && hit(back) {
                return Some(back);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 1000, 200);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_exact_target_size_single_chunk() {
        let text = "a".repeat(1000);
        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("", 1000, 200);
        assert_eq!(chunks, vec!["".to_string()]);
    }

    #[test]
    fn test_2500_chars_yields_three_chunks() {
        // Sentences of 50 chars each, so every naive boundary has a nearby
        // sentence end.
        let sentence = format!("{}. ", "x".repeat(48));
        let text: String = sentence.repeat(50); // 2500 chars
        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_max_chunk_length() {
        let text = "word ".repeat(2000);
        let chunks = chunk_text(&text, 1000, 200);
        for c in &chunks {
            assert!(
                c.chars().count() <= 1000 + SENTENCE_SLACK,
                "chunk too long: {}",
                c.chars().count()
            );
        }
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        // One sentence end sits 40 chars before the naive boundary at 100.
        let text = format!("{}. {}", "a".repeat(58), "b".repeat(200));
        let chunks = chunk_text(&text, 100, 0);
        assert!(
            chunks[0].ends_with('.'),
            "expected sentence cut, got {:?}",
            &chunks[0][chunks[0].len().saturating_sub(5)..]
        );
    }

    #[test]
    fn test_newline_fallback() {
        // No sentence punctuation anywhere; a newline 20 chars before the
        // naive boundary should win.
        let text = format!("{}\n{}", "a".repeat(79), "b".repeat(300));
        let chunks = chunk_text(&text, 100, 0);
        assert!(chunks[0].ends_with('\n'));
    }

    #[test]
    fn test_whitespace_fallback() {
        let text = format!("{} {}", "a".repeat(89), "b".repeat(300));
        let chunks = chunk_text(&text, 100, 0);
        assert!(chunks[0].ends_with(' '));
    }

    #[test]
    fn test_naive_cut_when_no_boundary() {
        let text = "x".repeat(350);
        let chunks = chunk_text(&text, 100, 0);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_overlap_recontext() {
        let text = "x".repeat(2500);
        let chunks = chunk_text(&text, 1000, 200);
        // Unbroken text cuts at naive boundaries, so consecutive chunks
        // share exactly `overlap` characters.
        let first: Vec<char> = chunks[0].chars().collect();
        let second: Vec<char> = chunks[1].chars().collect();
        let tail: String = first[first.len() - 200..].iter().collect();
        let head: String = second[..200].iter().collect();
        assert_eq!(tail, head);
    }

    #[test]
    fn test_overlap_ge_target_terminates() {
        let text = "y".repeat(500);
        let chunks = chunk_text(&text, 100, 100);
        assert!(!chunks.is_empty());
        // Strictly increasing starts mean at most one chunk per character.
        assert!(chunks.len() <= 500);
        let chunks = chunk_text(&text, 100, 250);
        assert!(chunks.len() <= 500);
    }

    #[test]
    fn test_left_to_right_ordering() {
        let sentence = format!("{}. ", "z".repeat(18));
        let text = sentence.repeat(100);
        let chunks = chunk_text(&text, 100, 20);
        // Every chunk must start at a strictly later offset than the last.
        let mut search_from = 0usize;
        let mut last_start = None;
        for c in &chunks {
            let at = text[search_from..]
                .find(c.as_str())
                .map(|p| p + search_from)
                .expect("chunk text not found in source");
            if let Some(prev) = last_start {
                assert!(at > prev, "chunk start did not advance");
            }
            last_start = Some(at);
            search_from = at + 1;
        }
    }

    #[test]
    fn test_multibyte_text_no_panic() {
        let text = "héllo wörld. ".repeat(300);
        let chunks = chunk_text(&text, 100, 20);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 100 + SENTENCE_SLACK);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "A sentence here. Another one! And a question? ".repeat(60);
        let a = chunk_text(&text, 400, 80);
        let b = chunk_text(&text, 400, 80);
        assert_eq!(a, b);
    }
}
