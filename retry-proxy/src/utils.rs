const TRUNCATION_MARKER: char = '…';

/// Shortens `s` to at most `max` characters for logging, marking the cut.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => {
            let mut shortened = s[..idx].to_string();
            shortened.push(TRUNCATION_MARKER);
            shortened
        }
        None => s.to_string(),
    }
}
