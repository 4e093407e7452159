use tutor_core::SearchResult;

/// Attribution line preceding each chunk in the context.
pub fn source_line(result: &SearchResult) -> String {
    let meta = &result.chunk.metadata;
    format!(
        "[Source: {} - {}]",
        meta.source_file.as_deref().unwrap_or("Unknown"),
        meta.topic.as_deref().unwrap_or("General")
    )
}

/// Concatenate attributed chunks in the given order until the next one would
/// push the total past `budget` characters. Chunks are never split; anything
/// already added stays.
pub fn build_context<'a>(results: impl IntoIterator<Item = &'a SearchResult>, budget: usize) -> String {
    let mut context = String::new();
    let mut used = 0;
    for result in results {
        let entry = format!("{}\n{}\n\n", source_line(result), result.chunk.text);
        let len = entry.chars().count();
        if used + len > budget {
            break;
        }
        context.push_str(&entry);
        used += len;
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::{ChunkMetadata, DocumentChunk};

    fn hit(text: &str, source: Option<&str>) -> SearchResult {
        let metadata = ChunkMetadata { source_file: source.map(Into::into), ..Default::default() };
        SearchResult { chunk: DocumentChunk::new(text, metadata), score: 1.0 }
    }

    #[test]
    fn stops_before_first_chunk_over_budget() {
        let results = vec![hit("short", Some("a.pdf")), hit(&"x".repeat(100), None), hit("tiny", None)];
        let first = "[Source: a.pdf - General]\nshort\n\n";
        let context = build_context(&results, first.chars().count() + 20);
        assert_eq!(context, first, "the oversized chunk ends assembly, later chunks are not tried");
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        let results = vec![hit("தமிழ்", None)];
        let entry = "[Source: Unknown - General]\nதமிழ்\n\n";
        assert_eq!(build_context(&results, entry.chars().count()), entry);
        assert!(build_context(&results, entry.chars().count() - 1).is_empty());
    }
}
