//! Shared utility functions for text handling.

/// Splits message content into whitespace-separated tokens, preserving
/// the byte offset where each token starts in the original string.
pub fn tokenize(input: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    for part in input.split_whitespace() {
        // split_whitespace drops offsets, so recover them by searching
        // forward from the previous token end.
        let start = input[offset..]
            .find(part)
            .map_or(offset, |found| offset + found);
        tokens.push((start, part));
        offset = start + part.len();
    }
    tokens
}

/// Truncates a string to at most `max_length` bytes with an ellipsis,
/// backing the cut off to the nearest character boundary.
pub fn truncate_string(input: &str, max_length: usize) -> String {
    if input.len() <= max_length {
        return input.to_string();
    }
    let mut cut = max_length.saturating_sub(3);
    while !input.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &input[..cut])
}
