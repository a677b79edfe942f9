//! Text flattening and overlapping-window chunking.
//!
//! [`flatten_value`] converts the CMS's nested key/value content trees into
//! plain searchable text; [`chunk_text`] splits that text into overlapping,
//! length-bounded windows, backing off to word boundaries so chunks don't
//! end mid-word. Neither function can fail; worst case they return an
//! empty result.

use serde_json::Value;

/// Recursion cap for [`flatten_value`]. Guards against pathological or
/// cyclic content trees without a separate cycle detector.
const MAX_FLATTEN_DEPTH: usize = 6;

/// Fraction of the window at which the word-boundary back-off starts
/// looking for a space.
const BOUNDARY_FLOOR_PERCENT: usize = 60;

/// Collapse all whitespace runs to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recursively flatten a JSON-like value into searchable text.
///
/// Strings, numbers, and booleans stringify directly. Array elements and
/// `key: value` pairs are joined with newlines, skipping empty results.
/// `null` and anything deeper than [`MAX_FLATTEN_DEPTH`] flatten to empty.
pub fn flatten_value(value: &Value) -> String {
    flatten_depth(value, 0)
}

fn flatten_depth(value: &Value, depth: usize) -> String {
    if depth >= MAX_FLATTEN_DEPTH {
        return String::new();
    }

    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| flatten_depth(item, depth + 1))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, item)| {
                let text = flatten_depth(item, depth + 1);
                if text.is_empty() {
                    None
                } else {
                    Some(format!("{}: {}", key, text))
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Split text into overlapping windows of at most `max_chars` characters.
///
/// The input is whitespace-normalized before measurement. Windows that
/// don't reach the end of the text back off to the last space at or after
/// 60% of the window, provided that position is still past the window
/// start; the next window starts `overlap` characters before the previous
/// end. Empty trimmed pieces are skipped.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = normalized.chars().collect();
    let total = chars.len();
    if total <= max_chars {
        return vec![normalized];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let mut end = (start + max_chars).min(total);

        if end < total {
            let floor = start + (max_chars * BOUNDARY_FLOOR_PERCENT) / 100;
            if let Some(space) = (floor..end).rev().find(|&i| chars[i] == ' ') {
                if space > start {
                    end = space;
                }
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= total {
            break;
        }

        let next = end.saturating_sub(overlap);
        // Forward progress even with a degenerate overlap configuration.
        start = if next > start { next } else { end };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Just a short   sentence.", 1200, 200);
        assert_eq!(chunks, vec!["Just a short sentence.".to_string()]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_text("   \n\t ", 1200, 200).is_empty());
    }

    #[test]
    fn test_chunks_respect_max_length() {
        let text = "word ".repeat(500);
        let chunks = chunk_text(&text, 120, 20);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk);
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = (0..400).map(|i| format!("tok{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 100, 30);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            // The tail of one chunk must reappear near the head of the next.
            let tail: String = pair[0].chars().rev().take(15).collect::<String>().chars().rev().collect();
            assert!(
                pair[1].contains(tail.trim()),
                "no overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_no_content_dropped() {
        let text = "alpha beta gamma delta ".repeat(60);
        let normalized = normalize_whitespace(&text);
        let chunks = chunk_text(&text, 150, 40);
        // Every normalized word must land in at least one chunk.
        for word in normalized.split(' ') {
            assert!(chunks.iter().any(|c| c.contains(word)));
        }
    }

    #[test]
    fn test_word_boundary_backoff() {
        let text = "supercalifragilistic ".repeat(40);
        let chunks = chunk_text(&text, 100, 10);
        for chunk in &chunks {
            assert!(!chunk.ends_with("supercali"), "chunk split mid-word: {}", chunk);
        }
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Gemütliches Zimmer mit Frühstück und schöner Gartenblick. ".repeat(30);
        let chunks = chunk_text(&text, 100, 20);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
    }

    #[test]
    fn test_flatten_scalars() {
        assert_eq!(flatten_value(&json!("hello")), "hello");
        assert_eq!(flatten_value(&json!(42)), "42");
        assert_eq!(flatten_value(&json!(true)), "true");
        assert_eq!(flatten_value(&json!(null)), "");
    }

    #[test]
    fn test_flatten_object_and_array() {
        let value = json!({
            "title": "Flamingo Apartment",
            "amenities": ["air conditioning", "sea view", ""],
            "floor": 2
        });
        let text = flatten_value(&value);
        assert!(text.contains("title: Flamingo Apartment"));
        assert!(text.contains("air conditioning\nsea view"));
        assert!(text.contains("floor: 2"));
        // Empty array elements are dropped.
        assert!(!text.contains("\n\n"));
    }

    #[test]
    fn test_flatten_skips_empty_nested() {
        let value = json!({ "a": { "b": null }, "c": "kept" });
        assert_eq!(flatten_value(&value), "c: kept");
    }

    #[test]
    fn test_flatten_depth_capped() {
        let mut value = json!("leaf");
        for _ in 0..10 {
            value = json!({ "nested": value });
        }
        // Deeper than the cap, the leaf is unreachable and everything
        // collapses to empty.
        assert_eq!(flatten_value(&value), "");
    }

    #[test]
    fn test_chunk_deterministic() {
        let text = "one two three four five ".repeat(50);
        assert_eq!(chunk_text(&text, 90, 25), chunk_text(&text, 90, 25));
    }
}
