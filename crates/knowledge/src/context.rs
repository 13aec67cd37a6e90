//! Context block handed to the language model.

use crate::retriever::RetrievedChunk;

/// Returned instead of a context block when retrieval finds nothing.
pub const NO_DATA_SENTINEL: &str = "No relevant data found.";

/// Render search results as a numbered context block.
///
/// ```text
/// RELEVANT DATA:
///
/// 1. Municipality: A. Total records: 50. Top crimes: theft: 30, assault: 20.
///    Available data: 50 records
/// ```
pub fn format_context(results: &[RetrievedChunk]) -> String {
    if results.is_empty() {
        return NO_DATA_SENTINEL.to_string();
    }

    let mut lines = vec!["RELEVANT DATA:\n".to_string()];
    for (i, result) in results.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, result.chunk.text));

        let records = result.chunk.sample_records.len();
        if records > 0 {
            lines.push(format!("   Available data: {} records", records));
        }
    }

    lines.join("\n")
}

/// Whether a formatted context carries retrieved data.
pub fn has_relevant_data(context: &str) -> bool {
    !context.contains(NO_DATA_SENTINEL)
}
