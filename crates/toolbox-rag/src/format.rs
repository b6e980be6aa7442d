//! Plain-text rendering of retrieval results for tool responses

use toolbox_core::ScoredResult;

/// Characters of content shown per result unless configured otherwise
pub const DEFAULT_PREVIEW_CHARS: usize = 250;

/// Render results as the text block returned to the MCP client
pub fn format_results(results: &[ScoredResult], preview_chars: usize) -> String {
    if results.is_empty() {
        return "No relevant information found.".to_string();
    }

    let mut output = String::from("Found relevant information:\n\n");
    for (i, result) in results.iter().enumerate() {
        let chunk = &result.chunk;
        output.push_str(&format!(
            "Result {} (Score: {:.4}, Source: {}, ID: {}):\n",
            i + 1,
            result.score,
            chunk.filename,
            chunk.chunk_id
        ));
        output.push_str(&format!("\"{}\"\n\n", preview(&chunk.content, preview_chars)));
    }

    output.trim_end().to_string()
}

/// First `max_chars` characters of `text`, with `...` appended when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use toolbox_core::RetrievedChunk;

    fn result(score: f64, id: &str, content: &str) -> ScoredResult {
        ScoredResult {
            score,
            chunk: RetrievedChunk::new(id, "guide.md", content),
        }
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(format_results(&[], 250), "No relevant information found.");
    }

    #[test]
    fn test_format_results() {
        let text = format_results(
            &[result(0.91234, "7", "First chunk"), result(0.5, "9", "Second")],
            250,
        );

        assert_eq!(
            text,
            "Found relevant information:\n\n\
             Result 1 (Score: 0.9123, Source: guide.md, ID: 7):\n\"First chunk\"\n\n\
             Result 2 (Score: 0.5000, Source: guide.md, ID: 9):\n\"Second\""
        );
    }

    #[test]
    fn test_preview_truncation() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
        // Multi-byte characters are cut on character boundaries
        assert_eq!(preview("åäöü", 2), "åä...");
    }

    #[test]
    fn test_long_content_is_truncated() {
        let long = "x".repeat(DEFAULT_PREVIEW_CHARS + 10);
        let text = format_results(&[result(1.0, "1", &long)], DEFAULT_PREVIEW_CHARS);

        let expected = format!("\"{}...\"", "x".repeat(DEFAULT_PREVIEW_CHARS));
        assert!(text.ends_with(&expected));
    }
}
